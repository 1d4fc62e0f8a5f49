use rustc_hash::FxHashMap;

use crate::animation::clip::TargetReference;
use crate::character::{Character, MorphTargetKey};
use crate::config::ResolverOptions;

/// Maps track names of a source clip to objects of one character.
///
/// Resolution order, first hit wins:
/// 1. morph alias table (full names, plus `morphTarget<N>` short forms)
/// 2. skeleton joint by exact name (resolves to the joint's transform node)
/// 3. morph target by exact name, scanning managers in order
/// 4. mesh by exact name
pub struct TargetResolver<'a> {
    character: &'a Character,
    aliases: FxHashMap<String, MorphTargetKey>,
    options: ResolverOptions,
}

impl<'a> TargetResolver<'a> {
    #[must_use]
    pub fn new(character: &'a Character, options: ResolverOptions) -> Self {
        let aliases = build_alias_table(character, options.morph_alias_prefix.as_deref());
        log::debug!(
            "Built morph alias table for '{}' with {} entries",
            character.name,
            aliases.len()
        );
        Self {
            character,
            aliases,
            options,
        }
    }

    #[must_use]
    pub fn character(&self) -> &Character {
        self.character
    }

    #[must_use]
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Resolves a single track name. `None` means the name matches nothing.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<TargetReference> {
        if let Some(&key) = self.aliases.get(name) {
            return Some(self.morph_reference(key, name));
        }

        if let Some(joint_key) = self.character.find_joint_by_name(name)
            && let Some(joint) = self.character.joint(joint_key)
        {
            return Some(TargetReference::Joint {
                joint: joint_key,
                transform: joint.transform,
                name: joint.name.clone(),
            });
        }

        if let Some(key) = self.character.find_morph_target_by_name(name) {
            return Some(self.morph_reference(key, name));
        }

        self.character
            .find_mesh_by_name(name)
            .map(|mesh| TargetReference::Mesh {
                mesh,
                name: name.to_string(),
            })
    }

    /// Resolves the track names of one clip, in order.
    ///
    /// With `reuse_previous_morph` enabled, an unresolvable name takes the
    /// most recent morph-channel resolution of the sequence. This is a
    /// best-effort heuristic for files whose morph tracks carry no usable
    /// names.
    pub fn resolve_sequence<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Vec<Option<TargetReference>> {
        let mut last_morph: Option<TargetReference> = None;
        names
            .into_iter()
            .map(|name| {
                let resolved = self.resolve(name);
                if let Some(target @ TargetReference::MorphChannel { .. }) = &resolved {
                    last_morph = Some(target.clone());
                }
                if resolved.is_some() || !self.options.reuse_previous_morph {
                    return resolved;
                }
                if let Some(previous) = &last_morph {
                    log::warn!(
                        "Target '{name}' not found, reusing previous morph target '{}'",
                        previous.name()
                    );
                }
                last_morph.clone()
            })
            .collect()
    }

    fn morph_reference(&self, key: MorphTargetKey, fallback_name: &str) -> TargetReference {
        let name = self
            .character
            .morph_target(key)
            .map_or_else(|| fallback_name.to_string(), |t| t.name.clone());
        TargetReference::MorphChannel {
            target: Some(key),
            name,
        }
    }
}

fn build_alias_table(character: &Character, prefix: Option<&str>) -> FxHashMap<String, MorphTargetKey> {
    let mut aliases = FxHashMap::default();
    for key in character.morph_targets_in_order() {
        let Some(target) = character.morph_target(key) else {
            continue;
        };
        if target.name.is_empty() {
            continue;
        }
        aliases.entry(target.name.clone()).or_insert(key);

        if let Some(index) = morph_alias_index(&target.name, prefix) {
            let short = format!("morphTarget{index}");
            log::debug!("Created alias: {short} -> {}", target.name);
            aliases.entry(short).or_insert(key);
        }
    }
    aliases
}

/// Extracts `N` from `<prefix>_mesh_<M>_<N>_MorphTarget`.
///
/// When `prefix` is given, the name must start with exactly that prefix.
#[must_use]
pub fn morph_alias_index<'n>(name: &'n str, prefix: Option<&str>) -> Option<&'n str> {
    let stem = name.strip_suffix("_MorphTarget")?;
    let (rest, index) = stem.rsplit_once('_')?;
    let (rest, mesh_index) = rest.rsplit_once('_')?;
    let head = rest.strip_suffix("_mesh")?;

    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_number(index) || !is_number(mesh_index) || head.is_empty() {
        return None;
    }
    if let Some(prefix) = prefix
        && head != prefix
    {
        return None;
    }
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_index_parses_expected_pattern() {
        assert_eq!(morph_alias_index("glassesGuy_mesh_2_38_MorphTarget", None), Some("38"));
        assert_eq!(morph_alias_index("glassesGuy_mesh_2_38_MorphTarget", Some("glassesGuy")), Some("38"));
        assert_eq!(morph_alias_index("glassesGuy_mesh_2_38_MorphTarget", Some("other")), None);
    }

    #[test]
    fn alias_index_rejects_malformed_names() {
        assert_eq!(morph_alias_index("mesh_2_38_MorphTarget", None), None);
        assert_eq!(morph_alias_index("guy_mesh_x_38_MorphTarget", None), None);
        assert_eq!(morph_alias_index("guy_mesh_2_38", None), None);
        assert_eq!(morph_alias_index("guy_mesh_2__MorphTarget", None), None);
    }
}
