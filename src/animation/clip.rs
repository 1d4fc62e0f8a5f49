use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::animation::curve::{Curve, TargetProperty};
use crate::animation::tracks::KeyframeCursor;
use crate::animation::values::CurveValue;
use crate::character::{JointKey, MeshKey, MorphTargetKey, NodeKey};
use crate::errors::{Error, Result};
use crate::resource::PlaybackResource;

/// Default key rate of loaded clips (frames per second).
pub const DEFAULT_FRAME_RATE: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    Once,
    #[default]
    Loop,
    PingPong,
}

/// The scene object a curve drives.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetReference {
    /// A node of the source file, not yet bound to any character.
    Unbound { name: String },
    /// A skeleton joint; curves drive the joint's transform node.
    Joint {
        joint: JointKey,
        transform: NodeKey,
        name: String,
    },
    /// A blendshape channel. `target` is `None` when only the name is known.
    MorphChannel {
        target: Option<MorphTargetKey>,
        name: String,
    },
    Mesh { mesh: MeshKey, name: String },
}

impl TargetReference {
    #[must_use]
    pub fn unbound(name: impl Into<String>) -> Self {
        TargetReference::Unbound { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TargetReference::Unbound { name }
            | TargetReference::Joint { name, .. }
            | TargetReference::MorphChannel { name, .. }
            | TargetReference::Mesh { name, .. } => name,
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        !matches!(self, TargetReference::Unbound { .. })
    }

    /// Durable identity used to group curves that drive the same object.
    #[must_use]
    pub fn identity(&self) -> TargetIdentity {
        match self {
            TargetReference::Unbound { name } => TargetIdentity::Unbound(name.clone()),
            TargetReference::Joint { transform, .. } => TargetIdentity::Node(*transform),
            TargetReference::MorphChannel { target: Some(key), .. } => TargetIdentity::Morph(*key),
            TargetReference::MorphChannel { target: None, name } => TargetIdentity::MorphName(name.clone()),
            TargetReference::Mesh { mesh, .. } => TargetIdentity::Mesh(*mesh),
        }
    }
}

/// Kind tag + durable key of a resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetIdentity {
    Unbound(String),
    Node(NodeKey),
    Morph(MorphTargetKey),
    MorphName(String),
    Mesh(MeshKey),
}

/// A curve together with the object it drives.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetedCurve {
    pub target: TargetReference,
    pub curve: Curve,
}

impl TargetedCurve {
    #[must_use]
    pub fn new(target: TargetReference, curve: Curve) -> Self {
        Self { target, curve }
    }

    #[must_use]
    pub fn property(&self) -> &TargetProperty {
        &self.curve.property
    }

    /// Blend grouping key.
    #[must_use]
    pub fn group_key(&self) -> (TargetIdentity, TargetProperty) {
        (self.target.identity(), self.curve.property.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A playable group of targeted curves sharing one timeline.
///
/// Clips own an engine-side [`PlaybackResource`]; it is released by
/// [`AnimationClip::dispose`] or when the clip is dropped.
#[derive(Debug)]
pub struct AnimationClip {
    id: Uuid,
    pub name: String,
    curves: Vec<TargetedCurve>,
    cursors: Vec<KeyframeCursor>,

    from: f32,
    to: f32,
    frame_rate: f32,
    pub loop_mode: LoopMode,
    pub speed_ratio: f32,

    state: PlaybackState,
    /// Frames elapsed since `from`. For PingPong, in `[0, 2 * duration)`.
    elapsed: f32,
    weight: f32,
    target_weight: f32,

    resource: PlaybackResource,
}

impl AnimationClip {
    /// Creates a clip whose frame range spans every curve's keys.
    #[must_use]
    pub fn new(name: impl Into<String>, curves: Vec<TargetedCurve>) -> Self {
        let frame_rate = curves
            .first()
            .map_or(DEFAULT_FRAME_RATE, |c| c.curve.frame_rate);
        let mut clip = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cursors: vec![KeyframeCursor::default(); curves.len()],
            curves,
            from: 0.0,
            to: 0.0,
            frame_rate,
            loop_mode: LoopMode::Loop,
            speed_ratio: 1.0,
            state: PlaybackState::Stopped,
            elapsed: 0.0,
            weight: 1.0,
            target_weight: 1.0,
            resource: PlaybackResource::detached(),
        };
        clip.recompute_range();
        clip
    }

    #[must_use]
    pub fn with_resource(mut self, resource: PlaybackResource) -> Self {
        self.resource = resource;
        self
    }

    /// Independent playable copy sharing no mutable state with `self`.
    #[must_use]
    pub fn clone_as(&self, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            curves: self.curves.clone(),
            cursors: vec![KeyframeCursor::default(); self.curves.len()],
            from: self.from,
            to: self.to,
            frame_rate: self.frame_rate,
            loop_mode: self.loop_mode,
            speed_ratio: self.speed_ratio,
            state: PlaybackState::Stopped,
            elapsed: 0.0,
            weight: 1.0,
            target_weight: 1.0,
            resource: self.resource.sibling(),
        }
    }

    /// Releases the playback resource and consumes the clip.
    pub fn dispose(self) {
        if self.resource.release() {
            log::debug!("Disposed clip '{}'", self.name);
        }
    }

    // ========================================================================
    // Curves
    // ========================================================================

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn curves(&self) -> &[TargetedCurve] {
        &self.curves
    }

    /// Mutable access to the curves. The frame range is recomputed afterwards
    /// by [`AnimationClip::recompute_range`] if keys were moved.
    pub fn curves_mut(&mut self) -> &mut [TargetedCurve] {
        &mut self.curves
    }

    #[must_use]
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn push_curve(&mut self, curve: TargetedCurve) {
        self.curves.push(curve);
        self.cursors.push(KeyframeCursor::default());
        self.recompute_range();
    }

    /// Sets `[from, to]` to the union of all curve key spans (`[0, 0]` when empty).
    pub fn recompute_range(&mut self) {
        let spans = self
            .curves
            .iter()
            .filter_map(|c| Some((c.curve.first_frame()?, c.curve.last_frame()?)));
        let (from, to) = spans.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (a, b)| {
            (lo.min(a), hi.max(b))
        });
        if from.is_finite() && to.is_finite() {
            self.from = from;
            self.to = to;
        } else {
            self.from = 0.0;
            self.to = 0.0;
        }
        self.cursors = vec![KeyframeCursor::default(); self.curves.len()];
        self.elapsed = self.elapsed.clamp(0.0, self.duration_frames());
    }

    /// A clip is well formed when its range is finite and ordered and every
    /// curve satisfies the keyframe invariants.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.from.is_finite()
            && self.to.is_finite()
            && self.from <= self.to
            && self.frame_rate > 0.0
            && self.curves.iter().all(|c| c.curve.validate().is_ok())
    }

    #[must_use]
    pub fn from(&self) -> f32 {
        self.from
    }

    #[must_use]
    pub fn to(&self) -> f32 {
        self.to
    }

    #[must_use]
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    #[must_use]
    pub fn duration_frames(&self) -> f32 {
        (self.to - self.from).max(0.0)
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f32 {
        self.duration_frames() / self.frame_rate
    }

    // ========================================================================
    // Playback
    // ========================================================================

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    #[must_use]
    pub fn current_frame(&self) -> f32 {
        let duration = self.duration_frames();
        let local = if self.loop_mode == LoopMode::PingPong && self.elapsed > duration {
            2.0 * duration - self.elapsed
        } else {
            self.elapsed
        };
        self.from + local
    }

    /// Starts playback. A paused clip resumes; a stopped clip starts at `from`.
    pub fn start(&mut self) {
        if self.state == PlaybackState::Stopped {
            self.elapsed = 0.0;
        }
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.elapsed = 0.0;
    }

    pub fn restart(&mut self) {
        self.elapsed = 0.0;
        self.state = PlaybackState::Playing;
    }

    /// Rewinds to `from` without changing the playback state.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        for cursor in &mut self.cursors {
            cursor.last_index = 0;
        }
    }

    /// Scrubs to an absolute frame, clamped to `[from, to]`.
    pub fn go_to_frame(&mut self, frame: f32) {
        self.elapsed = (frame - self.from).clamp(0.0, self.duration_frames());
    }

    // ========================================================================
    // Weight
    // ========================================================================

    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[must_use]
    pub fn target_weight(&self) -> f32 {
        self.target_weight
    }

    /// Sets the clip weight. When blending is enabled the weight ramps toward
    /// `weight` while the clip plays; otherwise it applies immediately.
    pub fn set_weight(&mut self, weight: f32) {
        self.target_weight = weight;
        if self.blending_speed().is_none() {
            self.weight = weight;
        }
    }

    /// Sets weight and target weight at once, bypassing any ramp.
    pub fn set_weight_immediate(&mut self, weight: f32) {
        self.weight = weight;
        self.target_weight = weight;
    }

    /// Resets the clip, drops its weight to 0 and marks every curve for
    /// blending, so playback fades in toward full weight at `speed` per frame.
    pub fn enable_blending(&mut self, speed: f32) {
        self.reset();
        self.fade_in(speed);
        log::debug!("Enabled blending on '{}' with speed {speed}", self.name);
    }

    /// Like [`AnimationClip::enable_blending`] but keeps the playhead.
    pub fn fade_in(&mut self, speed: f32) {
        self.weight = 0.0;
        self.target_weight = 1.0;
        for tc in &mut self.curves {
            tc.curve.blending.enabled = true;
            tc.curve.blending.speed = speed;
        }
    }

    /// Ramp speed of the first blend-enabled curve.
    #[must_use]
    pub fn blending_speed(&self) -> Option<f32> {
        self.curves
            .iter()
            .find(|c| c.curve.blending.enabled)
            .map(|c| c.curve.blending.speed)
    }

    fn ramp_weight(&mut self, frames: f32) {
        let Some(speed) = self.blending_speed() else {
            self.weight = self.target_weight;
            return;
        };
        let step = speed * frames;
        let delta = self.target_weight - self.weight;
        if delta.abs() <= step {
            self.weight = self.target_weight;
        } else {
            self.weight += step.copysign(delta);
        }
    }

    /// Advances playback by `dt` seconds.
    ///
    /// Returns `true` when a `Once` clip reached its end during this step; the
    /// clip is then stopped at its last frame.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }

        let frames = dt * self.frame_rate * self.speed_ratio;
        self.ramp_weight(frames.abs());

        let duration = self.duration_frames();
        if duration <= 0.0 {
            return false;
        }

        self.elapsed += frames;

        match self.loop_mode {
            LoopMode::Once => {
                if self.elapsed >= duration || self.elapsed < 0.0 {
                    self.elapsed = self.elapsed.clamp(0.0, duration);
                    self.state = PlaybackState::Stopped;
                    return true;
                }
            }
            LoopMode::Loop => {
                self.elapsed = self.elapsed.rem_euclid(duration);
            }
            LoopMode::PingPong => {
                self.elapsed = self.elapsed.rem_euclid(duration * 2.0);
            }
        }
        false
    }

    /// Samples curve `index` at the current frame.
    pub fn sample_curve(&mut self, index: usize) -> Option<CurveValue> {
        let frame = self.current_frame();
        let tc = self.curves.get(index)?;
        let cursor = self.cursors.get_mut(index)?;
        tc.curve.data.sample_with_cursor(frame, cursor)
    }

    #[must_use]
    pub fn resource(&self) -> &PlaybackResource {
        &self.resource
    }
}

/// The cached canonical clip of a source file. Never played, only cloned.
///
/// Keyframe well-formedness is checked once here; the clip is immutable after.
#[derive(Debug)]
pub struct MasterClip {
    clip: AnimationClip,
    well_formed: bool,
    disposed: AtomicBool,
}

impl MasterClip {
    #[must_use]
    pub fn new(clip: AnimationClip) -> Self {
        Self {
            well_formed: clip.is_well_formed(),
            clip,
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.clip.name
    }

    #[must_use]
    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }

    /// Checks that the master can still produce clones.
    pub fn validate(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::ClipDisposed(self.clip.name.clone()));
        }
        if !self.well_formed {
            return Err(Error::CacheCorruption(self.clip.name.clone()));
        }
        Ok(())
    }

    /// Creates an independent playable clone.
    pub fn instantiate(&self, name: impl Into<String>) -> Result<AnimationClip> {
        self.validate()?;
        Ok(self.clip.clone_as(name))
    }

    /// Marks the master disposed and releases its resource. Idempotent.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.clip.resource.release();
        log::debug!("Disposed master clip '{}'", self.clip.name);
        true
    }
}
