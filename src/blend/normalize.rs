//! Length normalization: stretches clips onto a common frame span so they can
//! be blended frame-aligned.

use crate::animation::clip::AnimationClip;
use crate::errors::{Error, Result};

/// Lengths closer than this are considered equal.
const LENGTH_EPSILON: f32 = 1e-3;

/// Returns a copy of `clip` whose keys are remapped from `[from, to]` onto
/// `[0, target_length]`. Curves with a single key keep their remapped position.
pub fn normalize_length(clip: &AnimationClip, target_length: f32) -> Result<AnimationClip> {
    if !target_length.is_finite() || target_length <= 0.0 {
        return Err(Error::InvalidBlendInput(format!(
            "target length must be positive, got {target_length}"
        )));
    }
    let length = clip.duration_frames();
    if length <= 0.0 {
        return Err(Error::InvalidBlendInput(format!(
            "clip '{}' has no length to normalize",
            clip.name
        )));
    }

    let start = clip.from();
    let scale = target_length / length;
    let mut normalized = clip.clone_as(format!("normalized_{}", clip.name));
    for tc in normalized.curves_mut() {
        tc.curve.data.map_frames(|f| (f - start) * scale);
    }
    normalized.recompute_range();
    Ok(normalized)
}

/// Stretches every clip to the longest clip's length.
///
/// Clips already at that length are returned as plain clones. Clips with no
/// length cannot be stretched and are cloned as-is.
pub fn normalize_to_longest(clips: &[&AnimationClip]) -> Result<Vec<AnimationClip>> {
    let longest = clips
        .iter()
        .map(|c| c.duration_frames())
        .fold(0.0_f32, f32::max);
    if longest <= 0.0 {
        return Err(Error::InvalidBlendInput(
            "could not determine a clip length to normalize to".to_string(),
        ));
    }

    clips
        .iter()
        .map(|clip| {
            let length = clip.duration_frames();
            if length <= 0.0 || (length - longest).abs() < LENGTH_EPSILON {
                Ok(clip.clone_as(clip.name.clone()))
            } else {
                normalize_length(clip, longest)
            }
        })
        .collect()
}
