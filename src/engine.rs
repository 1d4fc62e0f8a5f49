//! Engine Core Module
//!
//! [`AnimationEngine`] is the explicit context tying the subsystems together.
//! Several engines may coexist; nothing here is process-global.
//!
//! # Architecture
//!
//! - **`ClipSource`**: reads source files (glTF, in-memory, ...)
//! - **`ClipCache`**: one master clip per file, cloned on demand
//! - **`ResourceTracker`**: counts live playback resources
//! - **Retargeter / `ClipBlender`**: stateless transforms driven by the
//!   engine's configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use signmix::{AnimationEngine, GltfClipSource, CacheKey};
//!
//! let engine = AnimationEngine::new(GltfClipSource::new("assets"));
//! let wave = engine.load_retargeted("signs", "wave.glb", &avatar, "wave").await?;
//! let blended = engine
//!     .load_and_blend("mix", &[(CacheKey::new("signs", "a.glb"), 0.7), (CacheKey::new("signs", "b.glb"), 0.3)], &avatar)
//!     .await?;
//! ```

use std::sync::Arc;

use futures::future::join_all;

use crate::animation::clip::{AnimationClip, MasterClip};
use crate::blend::{ClipBlender, CombineOptions, combine_clips};
use crate::cache::{CacheKey, ClipCache};
use crate::character::Character;
use crate::config::EngineConfig;
use crate::errors::{Error, Result};
use crate::loader::ClipSource;
use crate::resource::ResourceTracker;
use crate::retarget::{Retargeter, apply_root_lock};
use crate::splice::{PlaybackSplicer, SpliceConfig};

/// The animation context: configuration, source, cache and resource tracker.
///
/// # Lifecycle
///
/// 1. Create with [`AnimationEngine::new`] or [`AnimationEngine::with_config`]
/// 2. Load clips with [`AnimationEngine::load_clip`] /
///    [`AnimationEngine::load_retargeted`] / [`AnimationEngine::load_and_blend`]
/// 3. Play them directly, through a mixer, or through a [`PlaybackSplicer`]
/// 4. [`AnimationEngine::clear_cache`] on teardown
pub struct AnimationEngine<S: ClipSource> {
    config: EngineConfig,
    cache: ClipCache,
    tracker: Arc<ResourceTracker>,
    source: S,
}

impl<S: ClipSource> AnimationEngine<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(source: S, config: EngineConfig) -> Self {
        log::info!(
            "Animation engine created (frame rate {}, cache {})",
            config.frame_rate,
            if config.use_cache { "on" } else { "off" }
        );
        Self {
            config,
            cache: ClipCache::new(),
            tracker: ResourceTracker::new(),
            source,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ClipCache {
        &self.cache
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &Arc<ResourceTracker> {
        &self.tracker
    }

    /// Playback resources currently held by clips from this engine,
    /// including cached masters.
    #[must_use]
    pub fn live_resources(&self) -> usize {
        self.tracker.live()
    }

    /// Attaches an engine-tracked resource to a clip built by hand.
    #[must_use]
    pub fn track(&self, clip: AnimationClip) -> AnimationClip {
        clip.with_resource(self.tracker.acquire())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Gets the master clip of a file, loading and caching it on a miss.
    ///
    /// The first clip of the file becomes the master; the configured root
    /// lock is applied before it is published.
    pub async fn load_master(&self, key: &CacheKey) -> Result<Arc<MasterClip>> {
        if self.config.use_cache {
            if let Some(master) = self.cache.get(key) {
                return Ok(master);
            }
            log::debug!("Cache miss for '{key}'");
        }

        let asset = self.source.load(key, self.config.frame_rate).await?;
        let Some(clip) = asset.clips.into_iter().next() else {
            return Err(Error::load_failure(key.to_string(), "file contains no animation clips"));
        };

        let mut clip = self.track(clip);
        apply_root_lock(&mut clip, &self.config.root_lock);
        let master = MasterClip::new(clip);
        if !master.is_well_formed() {
            return Err(Error::load_failure(key.to_string(), "clip keyframes are malformed"));
        }
        if self.config.use_cache {
            Ok(self.cache.put(key.clone(), master))
        } else {
            Ok(Arc::new(master))
        }
    }

    /// Loads a file and returns an independent, uniquely named clone of its
    /// master clip.
    pub async fn load_clip(&self, directory: &str, filename: &str) -> Result<AnimationClip> {
        self.load_key(&CacheKey::new(directory, filename)).await
    }

    /// Loads a file and retargets the clone onto `character`.
    pub async fn load_retargeted(
        &self,
        directory: &str,
        filename: &str,
        character: &Character,
        name: &str,
    ) -> Result<AnimationClip> {
        self.load_retargeted_key(&CacheKey::new(directory, filename), character, name)
            .await
    }

    /// Loads every source concurrently, retargets each onto `character` and
    /// blends them with the given weights.
    ///
    /// Any failed load fails the whole operation; clips loaded for the attempt
    /// are released before the error is returned.
    pub async fn load_and_blend(
        &self,
        name: &str,
        sources: &[(CacheKey, f32)],
        character: &Character,
    ) -> Result<AnimationClip> {
        if sources.is_empty() {
            return Err(Error::InvalidBlendInput("no sources to blend".to_string()));
        }

        let loads = sources.iter().enumerate().map(|(i, (key, _))| {
            let part_name = format!("{name}_part_{i}");
            async move { self.load_retargeted_key(key, character, &part_name).await }
        });
        let clips = join_all(loads)
            .await
            .into_iter()
            .collect::<Result<Vec<AnimationClip>>>()?;

        let pairs: Vec<(&AnimationClip, f32)> = clips.iter().zip(sources.iter().map(|(_, w)| *w)).collect();
        let blended = ClipBlender::create_blended(name, &pairs)?;
        log::info!(
            "Blended {} sources into '{name}' ({} curves)",
            sources.len(),
            blended.curve_count()
        );
        Ok(blended)
    }

    async fn load_key(&self, key: &CacheKey) -> Result<AnimationClip> {
        let master = self.load_master(key).await?;
        let name = self.cache.next_instance_name(key);
        master.instantiate(name)
    }

    async fn load_retargeted_key(&self, key: &CacheKey, character: &Character, name: &str) -> Result<AnimationClip> {
        let clip = self.load_key(key).await?;
        Ok(self.retarget(&clip, character, name))
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// Binds a clone of `clip` to `character` using the configured resolver
    /// options.
    #[must_use]
    pub fn retarget(&self, clip: &AnimationClip, character: &Character, name: &str) -> AnimationClip {
        Retargeter::new(character, self.config.resolver.clone()).retarget(clip, name)
    }

    pub fn create_blended(&self, name: &str, sources: &[(&AnimationClip, f32)]) -> Result<AnimationClip> {
        ClipBlender::create_blended(name, sources)
    }

    /// Rebuilds `blended` from `sources` in place. On failure `blended` is
    /// left untouched.
    pub fn update_weights(&self, blended: &mut AnimationClip, sources: &[(&AnimationClip, f32)]) -> Result<()> {
        ClipBlender::update_weights(blended, sources)
    }

    pub fn combine(&self, name: &str, clips: &[&AnimationClip], options: CombineOptions) -> Result<AnimationClip> {
        combine_clips(name, clips, options)
    }

    /// Enables the weight ramp on `clip` at the configured default speed.
    pub fn enable_blending(&self, clip: &mut AnimationClip) {
        clip.enable_blending(self.config.default_blending_speed);
    }

    /// Builds a configured splicer around a base and a gloss clip.
    pub fn splice(&self, base: AnimationClip, gloss: AnimationClip, config: SpliceConfig) -> Result<PlaybackSplicer> {
        config.validate()?;
        let mut splicer = PlaybackSplicer::new(base, gloss);
        splicer.configure(config)?;
        Ok(splicer)
    }

    // ========================================================================
    // Cache management
    // ========================================================================

    /// Disposes every cached master. Returns the number removed.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn evict(&self, key: &CacheKey) -> bool {
        self.cache.evict(key)
    }
}
