use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::animation::clip::{AnimationClip, TargetIdentity, TargetedCurve};
use crate::animation::curve::{Curve, TargetProperty};
use crate::blend::curve_blender::{CurveBlender, normalize_weights};
use crate::errors::{Error, Result};

type GroupKey = (TargetIdentity, TargetProperty);

/// Curves of one (target, property) pair across all sources.
struct Group<'a> {
    members: SmallVec<[(&'a TargetedCurve, f32); 4]>,
}

/// Assembles blended clips from weighted source clips.
pub struct ClipBlender;

impl ClipBlender {
    /// Blends every (target, property) pair of `sources` into a new clip.
    ///
    /// Pairs driven by a single source are copied unchanged. A result with no
    /// curves is valid and means the blend has nothing to play.
    pub fn create_blended(name: impl Into<String>, sources: &[(&AnimationClip, f32)]) -> Result<AnimationClip> {
        let name = name.into();
        if sources.is_empty() {
            return Err(Error::InvalidBlendInput("no source clips".to_string()));
        }
        let weights: Vec<f32> = sources.iter().map(|(_, w)| *w).collect();
        let weights = normalize_weights(&weights)?;

        // Group in first-seen order; one curve per pair per source.
        let mut order: Vec<GroupKey> = Vec::new();
        let mut groups: FxHashMap<GroupKey, Group<'_>> = FxHashMap::default();
        for ((clip, _), &weight) in sources.iter().zip(&weights) {
            if weight <= 0.0 {
                log::debug!("Skipping '{}' with zero weight", clip.name);
                continue;
            }
            let mut seen: FxHashSet<GroupKey> = FxHashSet::default();
            for tc in clip.curves() {
                let key = tc.group_key();
                if !seen.insert(key.clone()) {
                    log::warn!(
                        "Duplicate curve for '{}'.{} in '{}', keeping the first",
                        tc.target.name(),
                        tc.curve.property,
                        clip.name
                    );
                    continue;
                }
                groups
                    .entry(key.clone())
                    .or_insert_with(|| {
                        order.push(key);
                        Group {
                            members: SmallVec::new(),
                        }
                    })
                    .members
                    .push((tc, weight));
            }
        }

        let mut curves = Vec::with_capacity(order.len());
        for key in &order {
            let Some(group) = groups.get(key) else {
                continue;
            };
            let Some(&(lead, _)) = group.members.first() else {
                continue;
            };

            if group.members.len() == 1 {
                curves.push(lead.clone());
                continue;
            }

            let inputs: SmallVec<[&Curve; 4]> = group.members.iter().map(|(tc, _)| &tc.curve).collect();
            let group_weights: SmallVec<[f32; 4]> = group.members.iter().map(|(_, w)| *w).collect();
            match CurveBlender::blend(&inputs, &group_weights) {
                Ok(curve) => curves.push(TargetedCurve::new(lead.target.clone(), curve)),
                Err(e) => log::warn!(
                    "Skipping '{}'.{} in blend '{name}': {e}",
                    lead.target.name(),
                    lead.curve.property
                ),
            }
        }

        if curves.is_empty() {
            log::warn!("Blend '{name}' produced no curves");
        }

        let (lead_clip, _) = sources[0];
        let mut blended = AnimationClip::new(name, curves).with_resource(lead_clip.resource().sibling());
        blended.loop_mode = lead_clip.loop_mode;
        log::info!(
            "Created blended clip '{}' from {} sources with {} curves",
            blended.name,
            sources.len(),
            blended.curve_count()
        );
        Ok(blended)
    }

    /// Same as [`ClipBlender::create_blended`] with parallel clip and weight lists.
    pub fn blend_from_lists(name: impl Into<String>, clips: &[&AnimationClip], weights: &[f32]) -> Result<AnimationClip> {
        if clips.len() != weights.len() {
            return Err(Error::InvalidBlendInput(format!(
                "{} clips but {} weights",
                clips.len(),
                weights.len()
            )));
        }
        let sources: Vec<(&AnimationClip, f32)> = clips.iter().copied().zip(weights.iter().copied()).collect();
        Self::create_blended(name, &sources)
    }

    /// Rebuilds `blended` from `sources` with new weights.
    ///
    /// A playing clip keeps playing from the same frame. On failure `blended`
    /// is left untouched.
    pub fn update_weights(blended: &mut AnimationClip, sources: &[(&AnimationClip, f32)]) -> Result<()> {
        let mut rebuilt = Self::create_blended(blended.name.clone(), sources)?;
        rebuilt.loop_mode = blended.loop_mode;
        rebuilt.speed_ratio = blended.speed_ratio;
        rebuilt.set_weight(blended.target_weight());

        if blended.is_playing() {
            let frame = blended.current_frame();
            rebuilt.start();
            rebuilt.go_to_frame(frame);
        }

        let old = std::mem::replace(blended, rebuilt);
        old.dispose();
        Ok(())
    }
}
