//! Clip combination: merges several clips into one, either side by side or
//! one after another on a shared timeline.

use rustc_hash::FxHashMap;

use crate::animation::clip::{AnimationClip, TargetIdentity, TargetedCurve};
use crate::animation::curve::TargetProperty;
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombineOptions {
    /// Place each clip after the previous one instead of in parallel.
    pub sequential: bool,
    /// Frames left between consecutive clips in sequential mode.
    pub gap_frames: f32,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            sequential: true,
            gap_frames: 10.0,
        }
    }
}

/// Combines `clips` into one clip named `name`.
///
/// Sequential mode offsets each clip's keys by the running end frame (the
/// previous clips' last key frames plus gaps) and appends keys of curves that
/// drive the same (target, property) pair; with no gap, a clip's first key
/// replaces the previous clip's last one. Parallel mode keeps the first curve
/// per pair.
pub fn combine_clips(name: impl Into<String>, clips: &[&AnimationClip], options: CombineOptions) -> Result<AnimationClip> {
    let name = name.into();
    let Some(first) = clips.first() else {
        return Err(Error::InvalidBlendInput("no clips to combine".to_string()));
    };
    if !options.gap_frames.is_finite() || options.gap_frames < 0.0 {
        return Err(Error::InvalidBlendInput(format!(
            "gap must be a non-negative frame count, got {}",
            options.gap_frames
        )));
    }

    let mut curves: Vec<TargetedCurve> = Vec::new();
    let mut index: FxHashMap<(TargetIdentity, TargetProperty), usize> = FxHashMap::default();
    let mut total = 0.0_f32;

    for (part, clip) in clips.iter().enumerate() {
        let offset = if options.sequential { total } else { 0.0 };
        let end_frame = clip
            .curves()
            .iter()
            .filter_map(|tc| tc.curve.last_frame())
            .fold(0.0_f32, f32::max);

        for tc in clip.curves() {
            let mut shifted = tc.clone();
            if offset > 0.0 {
                shifted.curve.data.map_frames(|f| f + offset);
            }

            match index.get(&tc.group_key()) {
                Some(&existing) if options.sequential => {
                    if let Err(e) = curves[existing].curve.data.append(&shifted.curve.data) {
                        log::warn!(
                            "Dropping part {part} of '{}'.{} in '{name}': {e}",
                            tc.target.name(),
                            tc.curve.property
                        );
                    }
                }
                Some(_) => {
                    log::warn!(
                        "'{}'.{} already driven in '{name}', ignoring the copy from '{}'",
                        tc.target.name(),
                        tc.curve.property,
                        clip.name
                    );
                }
                None => {
                    index.insert(tc.group_key(), curves.len());
                    curves.push(shifted);
                }
            }
        }

        if options.sequential {
            total += end_frame + options.gap_frames;
        } else {
            total = total.max(end_frame);
        }
    }

    let mut combined = AnimationClip::new(name, curves).with_resource(first.resource().sibling());
    combined.loop_mode = first.loop_mode;
    log::info!(
        "Combined {} clips into '{}' with {} curves spanning {} frames",
        clips.len(),
        combined.name,
        combined.curve_count(),
        combined.to()
    );
    Ok(combined)
}
