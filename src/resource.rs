//! Playback Resource Tracking
//!
//! Every playable clip holds a [`PlaybackResource`] acquired from a shared
//! [`ResourceTracker`]. The resource is released exactly once: either by an
//! explicit `dispose` or when the owning clip is dropped, so intermediates
//! created on error paths never leak.
//!
//! # Design Principles
//! - Atomic counters so trackers can be shared across threads
//! - Release is idempotent and works through `&self` (shared master clips)
//! - Detached resources (no tracker) are allowed for ad-hoc clips

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Counts playback resources handed out by an engine.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    /// Resources acquired and not yet released
    live: AtomicUsize,
    /// Total ever acquired
    acquired: AtomicU64,
}

impl ResourceTracker {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquires a new resource bound to this tracker.
    #[must_use]
    pub fn acquire(self: &Arc<Self>) -> PlaybackResource {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.acquired.fetch_add(1, Ordering::Relaxed);
        PlaybackResource {
            tracker: Some(Arc::clone(self)),
            released: AtomicBool::new(false),
        }
    }

    /// Gets the number of resources currently alive
    #[inline]
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn total_acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    fn release_one(&self) {
        self.live.fetch_sub(1, Ordering::Release);
    }
}

/// Engine-side playback slot owned by one clip.
#[derive(Debug)]
pub struct PlaybackResource {
    tracker: Option<Arc<ResourceTracker>>,
    released: AtomicBool,
}

impl PlaybackResource {
    /// A resource not counted by any tracker.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            tracker: None,
            released: AtomicBool::new(false),
        }
    }

    /// Acquires another resource from the same tracker (or a detached one).
    #[must_use]
    pub fn sibling(&self) -> Self {
        match &self.tracker {
            Some(tracker) => tracker.acquire(),
            None => Self::detached(),
        }
    }

    #[must_use]
    pub fn tracker(&self) -> Option<&Arc<ResourceTracker>> {
        self.tracker.as_ref()
    }

    /// Releases the resource. Returns `false` if it was already released.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(tracker) = &self.tracker {
            tracker.release_one();
        }
        true
    }

    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Drop for PlaybackResource {
    fn drop(&mut self) {
        self.release();
    }
}
