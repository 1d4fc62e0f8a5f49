//! Base / Gloss Splicing
//!
//! [`PlaybackSplicer`] plays a base clip and, when the base reaches the
//! insertion time, hands over to a window of a second ("gloss") clip before
//! resuming the base where it paused. The two clips crossfade over the blend
//! duration: while one ramps in, the other is held at the complementary
//! weight, so an [`crate::animation::AnimationMixer`] fed with
//! [`PlaybackSplicer::clips_mut`] always sees weights summing to 1.

use serde::{Deserialize, Serialize};

use crate::animation::clip::{AnimationClip, DEFAULT_FRAME_RATE, LoopMode};
use crate::errors::{Error, Result};

/// Timing of one splice. All times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpliceConfig {
    /// Base-local time at which the gloss is inserted.
    pub insert_time: f32,
    /// Start of the gloss window on the gloss clip's timeline.
    pub gloss_start: f32,
    /// End of the gloss window on the gloss clip's timeline.
    pub gloss_end: f32,
    /// Crossfade length at both transitions. 0 switches instantly.
    pub blend_duration: f32,
    pub frame_rate: f32,
    /// Restart the base (and re-arm the insertion) when it ends.
    pub looping: bool,
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            insert_time: 0.0,
            gloss_start: 0.0,
            gloss_end: 1.0,
            blend_duration: 0.0,
            frame_rate: DEFAULT_FRAME_RATE,
            looping: false,
        }
    }
}

impl SpliceConfig {
    pub fn validate(&self) -> Result<()> {
        let times = [
            ("insert_time", self.insert_time),
            ("gloss_start", self.gloss_start),
            ("gloss_end", self.gloss_end),
            ("blend_duration", self.blend_duration),
        ];
        for (field, value) in times {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::SpliceConfigInvalid(format!(
                    "{field} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(Error::SpliceConfigInvalid(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.gloss_end <= self.gloss_start {
            return Err(Error::SpliceConfigInvalid(format!(
                "empty gloss window [{}, {}]",
                self.gloss_start, self.gloss_end
            )));
        }
        Ok(())
    }

    /// Length of the gloss window in seconds.
    #[must_use]
    pub fn gloss_duration(&self) -> f32 {
        self.gloss_end - self.gloss_start
    }

    /// Per-frame weight ramp speed, `None` for an instant switch.
    #[must_use]
    pub fn ramp_speed(&self) -> Option<f32> {
        (self.blend_duration > 0.0).then(|| 1.0 / (self.blend_duration * self.frame_rate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpliceState {
    #[default]
    Idle,
    PlayingBase,
    PlayingGloss,
}

pub struct PlaybackSplicer {
    base: AnimationClip,
    gloss: AnimationClip,
    config: Option<SpliceConfig>,

    state: SpliceState,
    paused: bool,
    /// The insertion already happened during the current base pass.
    inserted: bool,
    /// The base reached its end on the tick that triggered the insertion.
    base_finished: bool,

    timeline: f32,
    gloss_elapsed: f32,
}

impl PlaybackSplicer {
    /// Takes ownership of both clips. The base is switched to
    /// [`LoopMode::Once`]; looping is handled by the splice itself.
    #[must_use]
    pub fn new(mut base: AnimationClip, mut gloss: AnimationClip) -> Self {
        base.loop_mode = LoopMode::Once;
        base.stop();
        gloss.stop();
        gloss.set_weight_immediate(0.0);
        Self {
            base,
            gloss,
            config: None,
            state: SpliceState::Idle,
            paused: false,
            inserted: false,
            base_finished: false,
            timeline: 0.0,
            gloss_elapsed: 0.0,
        }
    }

    /// Validates and stores the splice timing.
    ///
    /// An invalid configuration is rejected before anything changes. A valid
    /// one applies from the next tick.
    pub fn configure(&mut self, config: SpliceConfig) -> Result<()> {
        config.validate()?;
        if config.insert_time * config.frame_rate > self.base.duration_frames() {
            log::warn!(
                "Insertion at {}s is past the end of base clip '{}'",
                config.insert_time,
                self.base.name
            );
        }
        self.config = Some(config);
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Starts from the top of the base clip. Resumes when paused and does
    /// nothing while already playing.
    pub fn play(&mut self) -> Result<()> {
        if self.config.is_none() {
            return Err(Error::SpliceConfigInvalid("splice is not configured".to_string()));
        }
        if self.state != SpliceState::Idle {
            self.resume();
            return Ok(());
        }

        self.timeline = 0.0;
        self.gloss_elapsed = 0.0;
        self.inserted = false;
        self.base_finished = false;
        self.paused = false;

        self.gloss.stop();
        self.gloss.set_weight_immediate(0.0);
        self.base.stop();
        self.base.set_weight_immediate(1.0);
        self.base.start();
        self.state = SpliceState::PlayingBase;
        log::debug!("Splice started on '{}'", self.base.name);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == SpliceState::Idle || self.paused {
            return;
        }
        self.paused = true;
        self.base.pause();
        self.gloss.pause();
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        match self.state {
            SpliceState::PlayingBase => self.base.start(),
            SpliceState::PlayingGloss => self.gloss.start(),
            SpliceState::Idle => {}
        }
    }

    pub fn stop(&mut self) {
        if self.state == SpliceState::Idle {
            return;
        }
        self.base.stop();
        self.base.set_weight_immediate(1.0);
        self.gloss.stop();
        self.gloss.set_weight_immediate(0.0);
        self.state = SpliceState::Idle;
        self.paused = false;
        self.inserted = false;
        self.base_finished = false;
        self.timeline = 0.0;
        self.gloss_elapsed = 0.0;
    }

    /// Advances the splice by `dt` seconds and returns the resulting state.
    pub fn tick(&mut self, dt: f32) -> SpliceState {
        let Some(config) = self.config else {
            return self.state;
        };
        if self.paused || self.state == SpliceState::Idle || !dt.is_finite() || dt <= 0.0 {
            return self.state;
        }
        self.timeline += dt;

        match self.state {
            SpliceState::PlayingBase => {
                let ended = self.base.advance(dt);
                self.gloss.set_weight_immediate(1.0 - self.base.weight());
                if !self.inserted && self.base_local_time() >= config.insert_time {
                    self.enter_gloss(&config, ended);
                } else if ended {
                    self.finish_base(&config);
                }
            }
            SpliceState::PlayingGloss => {
                self.gloss.advance(dt);
                self.gloss_elapsed += dt;
                self.base.set_weight_immediate(1.0 - self.gloss.weight());
                if self.gloss_elapsed >= config.gloss_duration() {
                    self.leave_gloss(&config);
                }
            }
            SpliceState::Idle => {}
        }
        self.state
    }

    fn enter_gloss(&mut self, config: &SpliceConfig, base_ended: bool) {
        self.inserted = true;
        self.base_finished = base_ended;
        self.base.go_to_frame(self.base.from() + config.insert_time * config.frame_rate);
        self.base.pause();

        self.gloss.stop();
        match config.ramp_speed() {
            Some(speed) => self.gloss.enable_blending(speed),
            None => self.gloss.set_weight_immediate(1.0),
        }
        self.gloss.start();
        self.gloss.go_to_frame(config.gloss_start * config.frame_rate);
        self.gloss_elapsed = 0.0;
        self.base.set_weight_immediate(1.0 - self.gloss.weight());

        self.state = SpliceState::PlayingGloss;
        log::debug!(
            "Splice inserted '{}' at {:.3}s of '{}'",
            self.gloss.name,
            config.insert_time,
            self.base.name
        );
    }

    fn leave_gloss(&mut self, config: &SpliceConfig) {
        self.gloss.pause();
        match config.ramp_speed() {
            Some(speed) => self.base.fade_in(speed),
            None => self.base.set_weight_immediate(1.0),
        }
        self.gloss.set_weight_immediate(1.0 - self.base.weight());
        self.state = SpliceState::PlayingBase;

        if self.base_finished {
            self.base_finished = false;
            self.finish_base(config);
        } else {
            self.base.start();
        }
    }

    fn finish_base(&mut self, config: &SpliceConfig) {
        if config.looping {
            self.base.restart();
            self.inserted = false;
            log::debug!("Splice looped '{}'", self.base.name);
        } else {
            self.base.stop();
            self.gloss.stop();
            self.base.set_weight_immediate(1.0);
            self.gloss.set_weight_immediate(0.0);
            self.state = SpliceState::Idle;
            log::debug!("Splice finished '{}'", self.base.name);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn state(&self) -> SpliceState {
        self.state
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn config(&self) -> Option<&SpliceConfig> {
        self.config.as_ref()
    }

    /// Seconds of splice playback since [`PlaybackSplicer::play`].
    #[must_use]
    pub fn timeline_time(&self) -> f32 {
        self.timeline
    }

    /// Position of the base playhead in seconds from the base's first frame.
    #[must_use]
    pub fn base_local_time(&self) -> f32 {
        let frame_rate = self.config.map_or(self.base.frame_rate(), |c| c.frame_rate);
        (self.base.current_frame() - self.base.from()) / frame_rate
    }

    /// Seconds spent in the current (or last) gloss window.
    #[must_use]
    pub fn gloss_elapsed(&self) -> f32 {
        self.gloss_elapsed
    }

    #[must_use]
    pub fn base(&self) -> &AnimationClip {
        &self.base
    }

    #[must_use]
    pub fn gloss(&self) -> &AnimationClip {
        &self.gloss
    }

    /// Both clips, for feeding an animation mixer.
    pub fn clips_mut(&mut self) -> [&mut AnimationClip; 2] {
        [&mut self.base, &mut self.gloss]
    }

    /// Stops playback and gives the clips back.
    #[must_use]
    pub fn into_clips(mut self) -> (AnimationClip, AnimationClip) {
        self.stop();
        (self.base, self.gloss)
    }
}
