//! Master Clip Cache
//!
//! Stores one [`MasterClip`] per source file and hands out independent
//! playable clones. Entries are immutable once published; the map itself is
//! guarded by a [`RwLock`] so a multi-threaded host can load, evict and clear
//! concurrently.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::animation::clip::{AnimationClip, MasterClip};

/// Directory + filename of a source clip file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub directory: String,
    pub filename: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(directory: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
        }
    }

    /// Filename without its extension, used to name clones.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map_or(self.filename.as_str(), |(stem, _)| stem)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.directory.is_empty() {
            f.write_str(&self.filename)
        } else {
            write!(f, "{}/{}", self.directory.trim_end_matches('/'), self.filename)
        }
    }
}

#[derive(Default)]
pub struct ClipCache {
    entries: RwLock<FxHashMap<CacheKey, Arc<MasterClip>>>,
    sequence: AtomicU64,
}

impl ClipCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// [Read] Gets a validated master.
    ///
    /// An entry failing validation is evicted and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<MasterClip>> {
        let master = self.entries.read().get(key).cloned()?;
        match master.validate() {
            Ok(()) => {
                log::debug!("Cache hit for '{key}'");
                Some(master)
            }
            Err(e) => {
                log::warn!("Evicting cache entry '{key}': {e}");
                self.evict_if_same(key, &master);
                None
            }
        }
    }

    /// [Write] Publishes a master under `key` and returns the published entry.
    ///
    /// When a valid entry already exists it is kept and `master` is disposed,
    /// so a double load of the same file is harmless.
    pub fn put(&self, key: CacheKey, master: MasterClip) -> Arc<MasterClip> {
        let mut guard = self.entries.write();
        if let Some(existing) = guard.get(&key)
            && existing.validate().is_ok()
        {
            master.dispose();
            return Arc::clone(existing);
        }

        let master = Arc::new(master);
        if let Some(old) = guard.insert(key, Arc::clone(&master)) {
            old.dispose();
        }
        master
    }

    /// [Write] Removes and disposes the entry. Returns whether it existed.
    pub fn evict(&self, key: &CacheKey) -> bool {
        let removed = self.entries.write().remove(key);
        match removed {
            Some(master) => {
                master.dispose();
                true
            }
            None => false,
        }
    }

    /// [Write] Disposes and removes every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<(CacheKey, Arc<MasterClip>)> = self.entries.write().drain().collect();
        for (key, master) in &drained {
            if !master.dispose() {
                log::debug!("Cache entry '{key}' was already disposed");
            }
        }
        log::info!("Cleared {} cached clips", drained.len());
        drained.len()
    }

    /// Creates a uniquely named playable clone of the cached master.
    pub fn instantiate(&self, key: &CacheKey) -> Option<AnimationClip> {
        let master = self.get(key)?;
        let name = self.next_instance_name(key);
        match master.instantiate(name) {
            Ok(clip) => Some(clip),
            Err(e) => {
                log::warn!("Evicting cache entry '{key}': {e}");
                self.evict_if_same(key, &master);
                None
            }
        }
    }

    /// `"<stem>_instance_<n>"` with a per-cache monotonic `n`.
    pub fn next_instance_name(&self, key: &CacheKey) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}_instance_{n}", key.stem())
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.read().keys().cloned().collect()
    }

    fn evict_if_same(&self, key: &CacheKey, master: &Arc<MasterClip>) {
        let mut guard = self.entries.write();
        if guard.get(key).is_some_and(|current| Arc::ptr_eq(current, master)) {
            guard.remove(key);
        }
        drop(guard);
        master.dispose();
    }
}
