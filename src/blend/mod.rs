//! Numeric blending of curves and clips, plus the clip-level helpers built on
//! top of it (length normalization and combination).

pub mod clip_blender;
pub mod combine;
pub mod curve_blender;
pub mod normalize;

pub use clip_blender::ClipBlender;
pub use combine::{CombineOptions, combine_clips};
pub use curve_blender::CurveBlender;
pub use normalize::{normalize_length, normalize_to_longest};
