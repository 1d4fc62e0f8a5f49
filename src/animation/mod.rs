pub mod clip;
pub mod curve;
pub mod mixer;
pub mod tracks;
pub mod values;

pub use clip::{
    AnimationClip, DEFAULT_FRAME_RATE, LoopMode, MasterClip, PlaybackState, TargetIdentity, TargetReference,
    TargetedCurve,
};
pub use curve::{Curve, CurveBlending, CurveData, TargetProperty};
pub use mixer::AnimationMixer;
pub use tracks::{InterpolationMode, Keyframe, KeyframeCursor, KeyframeTrack};
pub use values::{CurveValue, Interpolatable, ValueType};
