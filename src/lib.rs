#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod blend;
pub mod cache;
pub mod character;
pub mod config;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod resource;
pub mod retarget;
pub mod splice;

pub use animation::{
    AnimationClip, AnimationMixer, Curve, CurveData, CurveValue, Keyframe, KeyframeTrack, LoopMode, MasterClip,
    PlaybackState, TargetProperty, TargetReference, TargetedCurve, ValueType,
};
pub use blend::{ClipBlender, CombineOptions, CurveBlender};
pub use cache::{CacheKey, ClipCache};
pub use character::Character;
pub use config::{EngineConfig, ResolverOptions, RootLockConfig};
pub use engine::AnimationEngine;
pub use errors::{Error, Result};
pub use loader::{ClipSource, GltfClipSource, InMemoryClipSource, LoadedAsset};
pub use resource::{PlaybackResource, ResourceTracker};
pub use retarget::{Retargeter, TargetResolver};
pub use splice::{PlaybackSplicer, SpliceConfig, SpliceState};
