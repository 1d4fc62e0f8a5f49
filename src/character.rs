//! Character Model
//!
//! The minimal scene description the retargeter binds against: transform
//! nodes, one skeleton of joints (each driving a transform node), meshes, and
//! per-mesh morph-target managers. Objects live in [`SlotMap`] arenas and are
//! addressed by stable keys, which double as the durable identity used when
//! grouping curves for blending.

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct NodeKey;
    pub struct JointKey;
    pub struct MeshKey;
    pub struct MorphTargetKey;
}

/// Local TRS of a transform node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformNode {
    pub name: String,
    pub transform: Transform,
}

/// A skeleton joint. Animations drive the joint's `transform` node.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub transform: NodeKey,
}

#[derive(Debug, Clone)]
pub struct MorphTarget {
    pub name: String,
    pub influence: f32,
}

/// Ordered morph targets of one mesh.
#[derive(Debug, Clone, Default)]
pub struct MorphTargetManager {
    pub mesh: Option<MeshKey>,
    targets: Vec<MorphTargetKey>,
}

impl MorphTargetManager {
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[must_use]
    pub fn target(&self, index: usize) -> Option<MorphTargetKey> {
        self.targets.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = MorphTargetKey> + '_ {
        self.targets.iter().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub visibility: f32,
    /// Index into [`Character::morph_managers`]
    pub morph_manager: Option<usize>,
}

/// A target character: the object set a clip is bound to.
#[derive(Debug, Clone, Default)]
pub struct Character {
    pub name: String,
    nodes: SlotMap<NodeKey, TransformNode>,
    joints: SlotMap<JointKey, Joint>,
    skeleton: Vec<JointKey>,
    meshes: SlotMap<MeshKey, Mesh>,
    mesh_order: Vec<MeshKey>,
    morph_targets: SlotMap<MorphTargetKey, MorphTarget>,
    morph_managers: Vec<MorphTargetManager>,
    node_lookup: FxHashMap<String, NodeKey>,
}

impl Character {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Adds a transform node. The first node registered under a name wins lookups.
    pub fn add_node(&mut self, name: impl Into<String>, transform: Transform) -> NodeKey {
        let name = name.into();
        let key = self.nodes.insert(TransformNode {
            name: name.clone(),
            transform,
        });
        self.node_lookup.entry(name).or_insert(key);
        key
    }

    /// Adds a joint driving a freshly created transform node of the same name.
    pub fn add_joint(&mut self, name: impl Into<String>) -> JointKey {
        let name = name.into();
        let node = self.add_node(name.clone(), Transform::default());
        self.add_joint_for_node(name, node)
    }

    /// Adds a joint driving an existing node.
    pub fn add_joint_for_node(&mut self, name: impl Into<String>, node: NodeKey) -> JointKey {
        let key = self.joints.insert(Joint {
            name: name.into(),
            transform: node,
        });
        self.skeleton.push(key);
        key
    }

    pub fn add_mesh(&mut self, name: impl Into<String>) -> MeshKey {
        let key = self.meshes.insert(Mesh {
            name: name.into(),
            visibility: 1.0,
            morph_manager: None,
        });
        self.mesh_order.push(key);
        key
    }

    /// Appends a morph target to the mesh's manager, creating the manager on first use.
    pub fn add_morph_target(&mut self, mesh: MeshKey, name: impl Into<String>) -> Option<MorphTargetKey> {
        let manager_index = match self.meshes.get(mesh)?.morph_manager {
            Some(index) => index,
            None => {
                self.morph_managers.push(MorphTargetManager {
                    mesh: Some(mesh),
                    targets: Vec::new(),
                });
                let index = self.morph_managers.len() - 1;
                self.meshes.get_mut(mesh)?.morph_manager = Some(index);
                index
            }
        };

        let key = self.morph_targets.insert(MorphTarget {
            name: name.into(),
            influence: 0.0,
        });
        self.morph_managers[manager_index].targets.push(key);
        Some(key)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[must_use]
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeKey> {
        self.node_lookup.get(name).copied()
    }

    /// First joint (in skeleton order) with the given name.
    #[must_use]
    pub fn find_joint_by_name(&self, name: &str) -> Option<JointKey> {
        self.skeleton
            .iter()
            .copied()
            .find(|&key| self.joints.get(key).is_some_and(|j| j.name == name))
    }

    #[must_use]
    pub fn find_mesh_by_name(&self, name: &str) -> Option<MeshKey> {
        self.mesh_order
            .iter()
            .copied()
            .find(|&key| self.meshes.get(key).is_some_and(|m| m.name == name))
    }

    /// First morph target with the given name, scanning managers in order.
    #[must_use]
    pub fn find_morph_target_by_name(&self, name: &str) -> Option<MorphTargetKey> {
        self.morph_targets_in_order()
            .find(|&key| self.morph_targets.get(key).is_some_and(|t| t.name == name))
    }

    /// All morph targets, manager by manager, in authoring order.
    pub fn morph_targets_in_order(&self) -> impl Iterator<Item = MorphTargetKey> + '_ {
        self.morph_managers.iter().flat_map(MorphTargetManager::iter)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&TransformNode> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut TransformNode> {
        self.nodes.get_mut(key)
    }

    #[must_use]
    pub fn joint(&self, key: JointKey) -> Option<&Joint> {
        self.joints.get(key)
    }

    /// Joints in skeleton order.
    pub fn joints(&self) -> impl Iterator<Item = (JointKey, &Joint)> + '_ {
        self.skeleton
            .iter()
            .filter_map(|&key| self.joints.get(key).map(|j| (key, j)))
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.skeleton.len()
    }

    #[must_use]
    pub fn has_skeleton(&self) -> bool {
        !self.skeleton.is_empty()
    }

    #[must_use]
    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut Mesh> {
        self.meshes.get_mut(key)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshKey, &Mesh)> + '_ {
        self.mesh_order
            .iter()
            .filter_map(|&key| self.meshes.get(key).map(|m| (key, m)))
    }

    #[must_use]
    pub fn morph_managers(&self) -> &[MorphTargetManager] {
        &self.morph_managers
    }

    #[must_use]
    pub fn morph_target(&self, key: MorphTargetKey) -> Option<&MorphTarget> {
        self.morph_targets.get(key)
    }

    pub fn morph_target_mut(&mut self, key: MorphTargetKey) -> Option<&mut MorphTarget> {
        self.morph_targets.get_mut(key)
    }

    /// Resets every morph influence to zero.
    pub fn reset_morph_influences(&mut self) {
        for (_, target) in &mut self.morph_targets {
            target.influence = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morph_targets_are_grouped_per_mesh() {
        let mut character = Character::new("test");
        let face = character.add_mesh("face");
        let body = character.add_mesh("body");
        character.add_morph_target(face, "smile").unwrap();
        character.add_morph_target(body, "breathe").unwrap();
        character.add_morph_target(face, "blink").unwrap();

        assert_eq!(character.morph_managers().len(), 2);
        assert_eq!(character.morph_managers()[0].len(), 2);
        let names: Vec<_> = character
            .morph_targets_in_order()
            .map(|k| character.morph_target(k).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["smile", "blink", "breathe"]);
    }

    #[test]
    fn joint_drives_named_node() {
        let mut character = Character::new("test");
        let hips = character.add_joint("Hips");
        let joint = character.joint(hips).unwrap();
        assert_eq!(character.find_node_by_name("Hips"), Some(joint.transform));
        assert_eq!(character.find_joint_by_name("Hips"), Some(hips));
    }
}
