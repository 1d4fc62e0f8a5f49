//! Curve Blending
//!
//! Combines N curves driving the same (target, property) pair into one curve,
//! keyed at the union of all input key frames.
//!
//! # Algorithm
//!
//! 1. Collect every key frame of every input, sort, deduplicate.
//! 2. Normalize weights to sum to 1.
//! 3. At each frame, sample the contributing inputs by linear interpolation
//!    and combine them per value type:
//!    - scalar / vector / color: component-wise weighted sum, rescaled by
//!      `1 / w` when the contributing weight `w` is below 1
//!    - quaternion: sequential SLERP in descending weight order
//!    - matrix: unsupported
//!
//! An input contributes at a frame only when the frame lies inside its own
//! key span; outside, the remaining inputs are rescaled to full weight.

use glam::Quat;
use smallvec::SmallVec;

use crate::animation::curve::{Curve, CurveBlending, CurveData};
use crate::animation::values::{CurveValue, ValueType};
use crate::errors::{Error, Result};

/// Frames closer than this are treated as one key.
const FRAME_EPSILON: f32 = 1e-4;

/// A sampled value with its (already normalized) weight.
pub type WeightedValue = (CurveValue, f32);

pub struct CurveBlender;

impl CurveBlender {
    /// Blends `curves` with the matching `weights` into a new linear curve.
    ///
    /// Type, frame rate, loop mode and property come from the first curve.
    pub fn blend(curves: &[&Curve], weights: &[f32]) -> Result<Curve> {
        if curves.is_empty() {
            return Err(Error::InvalidBlendInput("no curves to blend".to_string()));
        }
        if curves.len() != weights.len() {
            return Err(Error::InvalidBlendInput(format!(
                "{} curves but {} weights",
                curves.len(),
                weights.len()
            )));
        }

        let first = curves[0];
        let value_type = first.value_type();
        if let Some(other) = curves.iter().find(|c| c.value_type() != value_type) {
            return Err(Error::MixedValueTypes(value_type, other.value_type()));
        }
        if !value_type.is_blendable() {
            return Err(Error::BlendTypeUnsupported(value_type));
        }

        let weights = normalize_weights(weights)?;
        let frames = union_frames(curves);
        if frames.is_empty() {
            return Err(Error::EmptyBlend);
        }

        let mut values = Vec::with_capacity(frames.len());
        for &frame in &frames {
            let mut samples: SmallVec<[WeightedValue; 4]> = curves
                .iter()
                .zip(&weights)
                .filter(|&(curve, &w)| w > 0.0 && curve.covers(frame))
                .filter_map(|(curve, &w)| Some((curve.data.sample_linear(frame)?, w)))
                .collect();

            // Every union frame is a key of some input, but that input may
            // carry zero weight. Fall back to clamped sampling of all inputs.
            if samples.is_empty() {
                samples = curves
                    .iter()
                    .zip(&weights)
                    .filter_map(|(curve, &w)| Some((curve.data.sample_linear(frame)?, w)))
                    .collect();
            }

            values.push(combine(&mut samples)?);
        }

        let data = CurveData::from_samples(value_type, frames, &values)?;
        Ok(Curve {
            name: first.name.clone(),
            property: first.property.clone(),
            data,
            frame_rate: first.frame_rate,
            loop_mode: first.loop_mode,
            blending: CurveBlending::default(),
        })
    }
}

/// Scales weights to sum to 1. Rejects negative, non-finite or all-zero sets.
pub fn normalize_weights(weights: &[f32]) -> Result<Vec<f32>> {
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(Error::InvalidBlendInput(format!("invalid weight {bad}")));
    }
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Err(Error::InvalidBlendInput("weights sum to zero".to_string()));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

fn union_frames(curves: &[&Curve]) -> Vec<f32> {
    let mut frames: Vec<f32> = curves
        .iter()
        .flat_map(|c| c.data.times().iter().copied())
        .collect();
    frames.sort_by(f32::total_cmp);
    frames.dedup_by(|a, b| (*a - *b).abs() < FRAME_EPSILON);
    frames
}

/// Combines weighted samples of one type.
///
/// Component types are summed and rescaled by `1 / total` when the total
/// weight is below 1. Quaternions go through [`slerp_chain`]. The slice is
/// reordered for quaternions.
pub fn combine(samples: &mut [WeightedValue]) -> Result<CurveValue> {
    let Some(&(first, _)) = samples.first() else {
        return Err(Error::EmptyBlend);
    };
    let value_type = first.value_type();
    if let Some((other, _)) = samples.iter().find(|(v, _)| v.value_type() != value_type) {
        return Err(Error::MixedValueTypes(value_type, other.value_type()));
    }

    let total: f32 = samples.iter().map(|(_, w)| w).sum();
    let rescale = if total > 0.0 && total < 1.0 { 1.0 / total } else { 1.0 };

    macro_rules! weighted_sum {
        ($variant:ident, $zero:expr) => {{
            let mut acc = $zero;
            for (value, w) in samples.iter() {
                if let CurveValue::$variant(v) = value {
                    acc += *v * *w;
                }
            }
            CurveValue::$variant(acc * rescale)
        }};
    }

    Ok(match value_type {
        ValueType::Scalar => weighted_sum!(Scalar, 0.0_f32),
        ValueType::Vector2 => weighted_sum!(Vector2, glam::Vec2::ZERO),
        ValueType::Vector3 => weighted_sum!(Vector3, glam::Vec3::ZERO),
        ValueType::Color3 => weighted_sum!(Color3, glam::Vec3::ZERO),
        ValueType::Color4 => weighted_sum!(Color4, glam::Vec4::ZERO),
        ValueType::Quaternion => CurveValue::Quaternion(slerp_chain(samples)),
        ValueType::Matrix => return Err(Error::BlendTypeUnsupported(ValueType::Matrix)),
    })
}

/// Sequential SLERP in descending weight order.
///
/// The heaviest sample seeds the result and its weight is taken off a
/// remaining budget of 1. Each following sample is blended in with factor
/// `w / remaining`, then its weight is taken off as well. Samples arriving
/// once the budget is spent are ignored. This is an order-dependent
/// approximation of a weighted rotation average.
pub fn slerp_chain(samples: &mut [WeightedValue]) -> Quat {
    samples.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut result: Option<Quat> = None;
    let mut remaining = 1.0_f32;
    for &(value, w) in samples.iter() {
        let CurveValue::Quaternion(q) = value else {
            continue;
        };
        match result {
            None => {
                result = Some(q);
                remaining -= w;
            }
            Some(current) if remaining > 0.0 => {
                result = Some(current.slerp(q, (w / remaining).min(1.0)));
                remaining -= w;
            }
            Some(_) => {}
        }
    }
    result.unwrap_or(Quat::IDENTITY)
}
