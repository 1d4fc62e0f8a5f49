use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::animation::clip::AnimationClip;
use crate::cache::CacheKey;
use crate::character::Character;
use crate::errors::{Error, Result};
use crate::loader::{ClipSource, LoadedAsset};

struct StoredAsset {
    clips: Vec<AnimationClip>,
    character: Option<Character>,
}

/// Serves programmatically built clips as if they were files.
///
/// Each load hands out fresh copies, so callers can treat the result exactly
/// like a parsed file.
#[derive(Default)]
pub struct InMemoryClipSource {
    assets: RwLock<FxHashMap<CacheKey, StoredAsset>>,
    loads: AtomicUsize,
}

impl InMemoryClipSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the contents served for `key`.
    pub fn insert(&self, key: CacheKey, clips: Vec<AnimationClip>, character: Option<Character>) {
        self.assets.write().insert(key, StoredAsset { clips, character });
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.assets.write().remove(key).is_some()
    }

    /// Number of successful loads served so far.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl InMemoryClipSource {
    fn snapshot(&self, key: &CacheKey) -> Result<LoadedAsset> {
        let guard = self.assets.read();
        let Some(stored) = guard.get(key) else {
            return Err(Error::load_failure(key.to_string(), "file not found"));
        };
        if stored.clips.is_empty() {
            return Err(Error::load_failure(key.to_string(), "file contains no animation clips"));
        }
        Ok(LoadedAsset {
            clips: stored.clips.iter().map(|c| c.clone_as(c.name.clone())).collect(),
            character: stored.character.clone(),
        })
    }
}

impl ClipSource for InMemoryClipSource {
    async fn load(&self, key: &CacheKey, _frame_rate: f32) -> Result<LoadedAsset> {
        let asset = self.snapshot(key)?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(asset)
    }
}
