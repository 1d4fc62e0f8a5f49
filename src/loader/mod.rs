//! Clip Sources
//!
//! A [`ClipSource`] turns a cache key (directory + filename) into the clips
//! and the character description of a file. Loaded clips target
//! [`crate::animation::TargetReference::Unbound`] node names; binding them to
//! a character is the retargeter's job.

pub mod gltf;
pub mod memory;

use std::future::Future;

use crate::animation::clip::AnimationClip;
use crate::cache::CacheKey;
use crate::character::Character;
use crate::errors::Result;

pub use self::gltf::GltfClipSource;
pub use self::memory::InMemoryClipSource;

/// Everything a source file provides.
#[derive(Debug, Default)]
pub struct LoadedAsset {
    /// Clips in file order. The first one becomes the cached master.
    pub clips: Vec<AnimationClip>,
    /// The file's own character, when it has a skeleton or meshes.
    pub character: Option<Character>,
}

/// Asynchronous clip loader.
pub trait ClipSource: Send + Sync {
    /// Loads the file named by `key`, converting key times to frames at
    /// `frame_rate` frames per second.
    fn load(&self, key: &CacheKey, frame_rate: f32) -> impl Future<Output = Result<LoadedAsset>> + Send;
}
