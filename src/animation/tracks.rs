use crate::animation::values::Interpolatable;
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
    CubicSpline,
}

const MAX_SCAN_OFFSET: usize = 3;

/// Frames closer than this count as the same key position.
const BOUNDARY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

/// One authored key: frame position, value and optional Hermite tangents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub frame: f32,
    pub value: T,
    pub in_tangent: Option<T>,
    pub out_tangent: Option<T>,
}

impl<T> Keyframe<T> {
    #[must_use]
    pub fn new(frame: f32, value: T) -> Self {
        Self {
            frame,
            value,
            in_tangent: None,
            out_tangent: None,
        }
    }

    #[must_use]
    pub fn with_tangents(mut self, in_tangent: T, out_tangent: T) -> Self {
        self.in_tangent = Some(in_tangent);
        self.out_tangent = Some(out_tangent);
        self
    }
}

/// Keyframe storage for a single animated channel.
///
/// `times` are frame positions (not seconds) and must be strictly increasing.
/// For `CubicSpline`, `values` holds `[in_tangent, value, out_tangent]` per key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// Builds a track from raw arrays without validation.
    ///
    /// Use [`KeyframeTrack::try_new`] for data that did not come from a
    /// validated source.
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    pub fn try_new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Result<Self> {
        let track = Self::new(times, values, interpolation);
        track.validate()?;
        Ok(track)
    }

    /// Builds a track from keyframes. Missing cubic tangents default to zero.
    pub fn from_keyframes(keys: &[Keyframe<T>], interpolation: InterpolationMode) -> Result<Self> {
        let times = keys.iter().map(|k| k.frame).collect();
        let values = match interpolation {
            InterpolationMode::CubicSpline => keys
                .iter()
                .flat_map(|k| {
                    [
                        k.in_tangent.unwrap_or_else(T::zero),
                        k.value,
                        k.out_tangent.unwrap_or_else(T::zero),
                    ]
                })
                .collect(),
            _ => keys.iter().map(|k| k.value).collect(),
        };
        Self::try_new(times, values, interpolation)
    }

    fn values_per_key(&self) -> usize {
        match self.interpolation {
            InterpolationMode::CubicSpline => 3,
            _ => 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let expected = self.times.len() * self.values_per_key();
        if self.values.len() != expected {
            return Err(Error::InvalidKeyframes(format!(
                "expected {expected} values for {} keys, got {}",
                self.times.len(),
                self.values.len()
            )));
        }
        if let Some(bad) = self.times.iter().find(|t| !t.is_finite()) {
            return Err(Error::InvalidKeyframes(format!("non-finite frame {bad}")));
        }
        if let Some(w) = self.times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::InvalidKeyframes(format!(
                "frames must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn first_frame(&self) -> Option<f32> {
        self.times.first().copied()
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<f32> {
        self.times.last().copied()
    }

    /// Reads the keys back as [`Keyframe`]s.
    #[must_use]
    pub fn keyframes(&self) -> Vec<Keyframe<T>> {
        (0..self.times.len())
            .map(|i| {
                let key = Keyframe::new(self.times[i], *self.get_value_at(i));
                match self.interpolation {
                    InterpolationMode::CubicSpline => {
                        key.with_tangents(self.values[i * 3], self.values[i * 3 + 2])
                    }
                    _ => key,
                }
            })
            .collect()
    }

    /// Replaces every key. The track is left untouched when validation fails.
    pub fn set_keyframes(&mut self, keys: &[Keyframe<T>]) -> Result<()> {
        *self = Self::from_keyframes(keys, self.interpolation)?;
        Ok(())
    }

    /// Applies `f` to every stored value (tangents included).
    pub fn map_values(&mut self, mut f: impl FnMut(T) -> T) {
        for v in &mut self.values {
            *v = f(*v);
        }
    }

    /// Remaps key positions. `f` must be strictly monotonic increasing.
    pub fn map_frames(&mut self, mut f: impl FnMut(f32) -> f32) {
        for t in &mut self.times {
            *t = f(*t);
        }
    }

    /// Appends `other`'s keys after this track's last key.
    ///
    /// When `other` starts on this track's last frame, its first key replaces
    /// that key.
    pub fn append(&mut self, other: &Self) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if self.interpolation != other.interpolation {
            return Err(Error::InvalidKeyframes(format!(
                "cannot append {:?} keys to a {:?} track",
                other.interpolation, self.interpolation
            )));
        }
        if let (Some(last), Some(first)) = (self.last_frame(), other.first_frame()) {
            if (first - last).abs() < BOUNDARY_EPSILON {
                let stride = self.values_per_key();
                self.times.pop();
                self.values.truncate(self.values.len().saturating_sub(stride));
            } else if first < last {
                return Err(Error::InvalidKeyframes(format!(
                    "appended keys start at {first}, before {last}"
                )));
            }
        }
        self.times.extend_from_slice(&other.times);
        self.values.extend_from_slice(&other.values);
        Ok(())
    }

    #[must_use]
    pub fn sample(&self, frame: f32) -> Option<T> {
        if self.times.is_empty() {
            return None;
        }
        // partition_point finds the first index where t > frame, i.e. next_index
        let next_idx = self.times.partition_point(|&t| t <= frame);
        Some(self.sample_at_index(next_idx.saturating_sub(1), frame))
    }

    /// Samples with straight linear interpolation between the bracketing keys,
    /// whatever the track's own interpolation mode. Clamps outside the range.
    #[must_use]
    pub fn sample_linear(&self, frame: f32) -> Option<T> {
        let len = self.times.len();
        if len == 0 {
            return None;
        }
        let next_idx = self.times.partition_point(|&t| t <= frame);
        if next_idx == 0 {
            return Some(*self.get_value_at(0));
        }
        if next_idx >= len {
            return Some(*self.get_value_at(len - 1));
        }
        let index = next_idx - 1;
        let t = Self::segment_factor(self.times[index], self.times[next_idx], frame);
        Some(T::interpolate_linear(
            *self.get_value_at(index),
            *self.get_value_at(next_idx),
            t,
        ))
    }

    /// Sampling with cursor. `cursor` is updated to the segment containing `frame`.
    pub fn sample_with_cursor(&self, frame: f32, cursor: &mut KeyframeCursor) -> Option<T> {
        let len = self.times.len();
        if len == 0 {
            return None;
        }
        // Fast path: static data (single keyframe)
        if len == 1 {
            return Some(*self.get_value_at(0));
        }

        // Cursor may be stale if the track was replaced
        let i = cursor.last_index.min(len - 1);
        let t_curr = self.times[i];

        let found_index = if frame >= t_curr {
            // Forward playback: check [i, i+1), [i+1, i+2) ...
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                let idx = i + offset;
                if idx >= len - 1 {
                    res = Some(len - 1);
                    break;
                }
                if frame < self.times[idx + 1] {
                    res = Some(idx);
                    break;
                }
            }
            res
        } else {
            // Reverse playback or loop reset
            (0..=MAX_SCAN_OFFSET)
                .take_while(|&offset| offset <= i)
                .map(|offset| i - offset)
                .find(|&idx| frame >= self.times[idx])
        };

        // Large jump (scrubbing): fall back to binary search
        let index = found_index.unwrap_or_else(|| {
            self.times
                .partition_point(|&t| t <= frame)
                .saturating_sub(1)
        });
        cursor.last_index = index;

        Some(self.sample_at_index(index, frame))
    }

    /// For Linear/Step, the index is used directly.
    /// For CubicSpline, the value is at index * 3 + 1.
    fn get_value_at(&self, index: usize) -> &T {
        match self.interpolation {
            InterpolationMode::CubicSpline => &self.values[index * 3 + 1],
            _ => &self.values[index],
        }
    }

    fn segment_factor(t0: f32, t1: f32, frame: f32) -> f32 {
        let dt = t1 - t0;
        let t = if dt > 1e-6 { (frame - t0) / dt } else { 0.0 };
        t.clamp(0.0, 1.0)
    }

    fn sample_at_index(&self, index: usize, frame: f32) -> T {
        let len = self.times.len();

        if index >= len - 1 {
            return *self.get_value_at(len - 1);
        }
        if index == 0 && frame < self.times[0] {
            return *self.get_value_at(0);
        }

        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let t = Self::segment_factor(t0, t1, frame);

        match self.interpolation {
            InterpolationMode::Step => *self.get_value_at(index),
            InterpolationMode::Linear => {
                T::interpolate_linear(*self.get_value_at(index), *self.get_value_at(next_idx), t)
            }
            InterpolationMode::CubicSpline => {
                let i_prev = index * 3;
                let i_next = next_idx * 3;

                let v0 = self.values[i_prev + 1];
                let out_tangent0 = self.values[i_prev + 2];
                let in_tangent1 = self.values[i_next];
                let v1 = self.values[i_next + 1];

                T::interpolate_cubic(v0, out_tangent0, in_tangent1, v1, t, t1 - t0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_unordered_frames() {
        let err = KeyframeTrack::try_new(vec![0.0, 2.0, 2.0], vec![0.0_f32, 1.0, 2.0], InterpolationMode::Linear);
        assert!(matches!(err, Err(Error::InvalidKeyframes(_))));
    }

    #[test]
    fn validate_rejects_value_count_mismatch() {
        let err = KeyframeTrack::try_new(vec![0.0, 1.0], vec![0.0_f32; 2], InterpolationMode::CubicSpline);
        assert!(err.is_err());
    }

    #[test]
    fn cubic_keyframes_roundtrip_tangents() {
        let keys = [
            Keyframe::new(0.0, 1.0_f32).with_tangents(0.5, 0.25),
            Keyframe::new(10.0, 2.0_f32),
        ];
        let track = KeyframeTrack::from_keyframes(&keys, InterpolationMode::CubicSpline).unwrap();
        let read = track.keyframes();
        assert_eq!(read[0].out_tangent, Some(0.25));
        assert_eq!(read[1].in_tangent, Some(0.0));
    }
}
