use glam::Quat;

use crate::animation::clip::{AnimationClip, TargetReference, TargetedCurve};
use crate::animation::curve::{CurveData, TargetProperty};
use crate::animation::values::Interpolatable;
use crate::character::Character;
use crate::config::{ResolverOptions, RootLockConfig};
use crate::retarget::resolver::TargetResolver;

/// Produces character-bound clones of clips.
///
/// Retargeting runs in two phases: every track name is resolved first (in
/// track order, so the fallback heuristic sees earlier resolutions), then the
/// clone is assembled from the finished map without further lookups.
pub struct Retargeter<'a> {
    resolver: TargetResolver<'a>,
}

impl<'a> Retargeter<'a> {
    #[must_use]
    pub fn new(character: &'a Character, options: ResolverOptions) -> Self {
        Self {
            resolver: TargetResolver::new(character, options),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &TargetResolver<'a> {
        &self.resolver
    }

    /// Phase one: the resolution of every curve of `clip`, by curve index.
    #[must_use]
    pub fn resolve_map(&self, clip: &AnimationClip) -> Vec<Option<TargetReference>> {
        self.resolver
            .resolve_sequence(clip.curves().iter().map(|tc| tc.target.name()))
    }

    /// Clones `clip` as `new_name`, bound to the character.
    ///
    /// Curves whose target resolves to nothing are dropped with a warning, so
    /// the result never has more curves than the input.
    #[must_use]
    pub fn retarget(&self, clip: &AnimationClip, new_name: impl Into<String>) -> AnimationClip {
        let new_name = new_name.into();
        let map = self.resolve_map(clip);

        let mut dropped = 0usize;
        let curves: Vec<TargetedCurve> = clip
            .curves()
            .iter()
            .zip(map)
            .filter_map(|(tc, target)| match target {
                Some(target) => Some(TargetedCurve::new(target, tc.curve.clone())),
                None => {
                    dropped += 1;
                    log::warn!(
                        "Target '{}' not found on '{}', dropping its {} curve",
                        tc.target.name(),
                        self.resolver.character().name,
                        tc.curve.property
                    );
                    None
                }
            })
            .collect();

        let mut retargeted = AnimationClip::new(new_name, curves).with_resource(clip.resource().sibling());
        retargeted.loop_mode = clip.loop_mode;
        retargeted.speed_ratio = clip.speed_ratio;

        log::info!(
            "Retargeted '{}' to '{}' as '{}': {} curves kept, {dropped} dropped",
            clip.name,
            self.resolver.character().name,
            retargeted.name,
            retargeted.curve_count()
        );
        retargeted
    }
}

/// Overwrites every rotation key of the configured root joints with the lock
/// rotation. Returns the number of keys changed.
pub fn apply_root_lock(clip: &mut AnimationClip, lock: &RootLockConfig) -> usize {
    if !lock.enabled {
        return 0;
    }
    let mut changed = 0;
    for tc in clip.curves_mut() {
        if tc.curve.property != TargetProperty::Rotation || !lock.applies_to(tc.target.name()) {
            continue;
        }
        if let CurveData::Quaternion(track) = &mut tc.curve.data {
            let mut keys = track.keyframes();
            for key in &mut keys {
                key.value = lock.rotation;
                key.in_tangent = key.in_tangent.map(|_| Quat::zero());
                key.out_tangent = key.out_tangent.map(|_| Quat::zero());
            }
            changed += keys.len();
            if let Err(e) = track.set_keyframes(&keys) {
                log::error!("Failed to lock rotation of '{}': {e}", tc.target.name());
            }
        }
    }
    if changed > 0 {
        log::debug!("Locked {changed} root rotation keys in '{}'", clip.name);
    }
    changed
}
