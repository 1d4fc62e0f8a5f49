use glam::Quat;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::animation::clip::{AnimationClip, PlaybackState, TargetReference};
use crate::animation::curve::TargetProperty;
use crate::animation::values::CurveValue;
use crate::blend::curve_blender::{WeightedValue, combine};
use crate::character::{Character, MeshKey, MorphTargetKey, NodeKey};

/// A concrete writable property of the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Position(NodeKey),
    Rotation(NodeKey),
    Scaling(NodeKey),
    Influence(MorphTargetKey),
    Visibility(MeshKey),
}

impl Slot {
    fn resolve(character: &Character, target: &TargetReference, property: &TargetProperty) -> Option<Self> {
        let node = || match target {
            TargetReference::Joint { transform, .. } => Some(*transform),
            TargetReference::Unbound { name } => character.find_node_by_name(name),
            _ => None,
        };
        match property {
            TargetProperty::Position => node().map(Slot::Position),
            TargetProperty::Rotation => node().map(Slot::Rotation),
            TargetProperty::Scaling => node().map(Slot::Scaling),
            TargetProperty::Influence => match target {
                TargetReference::MorphChannel { target: Some(key), .. } => Some(Slot::Influence(*key)),
                TargetReference::MorphChannel { target: None, name } | TargetReference::Unbound { name } => {
                    character.find_morph_target_by_name(name).map(Slot::Influence)
                }
                _ => None,
            },
            TargetProperty::Visibility => match target {
                TargetReference::Mesh { mesh, .. } => Some(Slot::Visibility(*mesh)),
                TargetReference::Unbound { name } => character.find_mesh_by_name(name).map(Slot::Visibility),
                _ => None,
            },
            TargetProperty::Custom(_) => None,
        }
    }

    fn read(self, character: &Character) -> Option<CurveValue> {
        Some(match self {
            Slot::Position(node) => CurveValue::Vector3(character.node(node)?.transform.position),
            Slot::Rotation(node) => CurveValue::Quaternion(character.node(node)?.transform.rotation),
            Slot::Scaling(node) => CurveValue::Vector3(character.node(node)?.transform.scale),
            Slot::Influence(key) => CurveValue::Scalar(character.morph_target(key)?.influence),
            Slot::Visibility(mesh) => CurveValue::Scalar(character.mesh(mesh)?.visibility),
        })
    }

    fn write(self, character: &mut Character, value: CurveValue) -> bool {
        match (self, value) {
            (Slot::Position(node), CurveValue::Vector3(v)) => {
                let Some(n) = character.node_mut(node) else { return false };
                n.transform.position = v;
            }
            (Slot::Rotation(node), CurveValue::Quaternion(q)) => {
                let Some(n) = character.node_mut(node) else { return false };
                n.transform.rotation = q.normalize();
            }
            (Slot::Scaling(node), CurveValue::Vector3(v)) => {
                let Some(n) = character.node_mut(node) else { return false };
                n.transform.scale = v;
            }
            (Slot::Influence(key), CurveValue::Scalar(s)) => {
                let Some(t) = character.morph_target_mut(key) else { return false };
                t.influence = s;
            }
            (Slot::Visibility(mesh), CurveValue::Scalar(s)) => {
                let Some(m) = character.mesh_mut(mesh) else { return false };
                m.visibility = s;
            }
            _ => return false,
        }
        true
    }
}

/// Evaluates clips and writes their weighted values into a character.
///
/// Playing and paused clips with positive weight contribute. Per property,
/// contributions are normalized when their weights sum above 1; below 1 the
/// character's current value fills the remainder.
#[derive(Default)]
pub struct AnimationMixer {
    order: Vec<Slot>,
    pending: FxHashMap<Slot, SmallVec<[WeightedValue; 4]>>,
}

impl AnimationMixer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances every clip by `dt` seconds, then applies them.
    pub fn update(&mut self, dt: f32, clips: &mut [&mut AnimationClip], character: &mut Character) {
        for clip in clips.iter_mut() {
            clip.advance(dt);
        }
        self.apply(clips, character);
    }

    /// Samples every active clip at its current frame and writes the result.
    /// Returns the number of properties written.
    pub fn apply(&mut self, clips: &mut [&mut AnimationClip], character: &mut Character) -> usize {
        self.order.clear();
        self.pending.clear();

        for clip in clips.iter_mut() {
            if clip.state() == PlaybackState::Stopped || clip.weight() <= 0.0 {
                continue;
            }
            let weight = clip.weight();
            for index in 0..clip.curve_count() {
                let Some(value) = clip.sample_curve(index) else {
                    continue;
                };
                let tc = &clip.curves()[index];
                let Some(slot) = Slot::resolve(character, &tc.target, &tc.curve.property) else {
                    continue;
                };
                let entry = self.pending.entry(slot).or_default();
                if entry.is_empty() {
                    self.order.push(slot);
                }
                entry.push((value, weight));
            }
        }

        let mut written = 0;
        for slot in &self.order {
            let Some(samples) = self.pending.get_mut(slot) else {
                continue;
            };
            let total: f32 = samples.iter().map(|(_, w)| w).sum();
            if total > 1.0 {
                for (_, w) in samples.iter_mut() {
                    *w /= total;
                }
            } else if total < 1.0
                && let Some(current) = slot.read(character)
            {
                samples.push((current, 1.0 - total));
            }

            let combined = match slot {
                Slot::Rotation(_) => Ok(CurveValue::Quaternion(running_slerp(samples))),
                _ => combine(samples),
            };
            match combined {
                Ok(value) => {
                    if slot.write(character, value) {
                        written += 1;
                    }
                }
                Err(e) => log::warn!("Cannot apply {slot:?}: {e}"),
            }
        }
        written
    }
}

/// Weighted running SLERP over weights that sum to 1: each sample moves the
/// result by its share of the weight accumulated so far.
fn running_slerp(samples: &mut [WeightedValue]) -> Quat {
    samples.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut result: Option<Quat> = None;
    let mut accumulated = 0.0;
    for &(value, w) in samples.iter() {
        let CurveValue::Quaternion(q) = value else {
            continue;
        };
        accumulated += w;
        result = Some(match result {
            None => q,
            Some(current) if accumulated > 0.0 => current.slerp(q, w / accumulated),
            Some(current) => current,
        });
    }
    result.unwrap_or(Quat::IDENTITY)
}
