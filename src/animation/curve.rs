use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::animation::clip::LoopMode;
use crate::animation::tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
use crate::animation::values::{CurveValue, ValueType};
use crate::errors::{Error, Result};

/// The animated property a curve writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetProperty {
    /// Maps to transform.position
    Position,
    /// Maps to transform.rotation (`rotationQuaternion`)
    Rotation,
    /// Maps to transform.scale
    Scaling,
    /// Morph target influence
    Influence,
    /// Mesh visibility
    Visibility,
    Custom(String),
}

impl TargetProperty {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TargetProperty::Position => "position",
            TargetProperty::Rotation => "rotationQuaternion",
            TargetProperty::Scaling => "scaling",
            TargetProperty::Influence => "influence",
            TargetProperty::Visibility => "visibility",
            TargetProperty::Custom(name) => name,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "position" => TargetProperty::Position,
            "rotationQuaternion" => TargetProperty::Rotation,
            "scaling" => TargetProperty::Scaling,
            "influence" => TargetProperty::Influence,
            "visibility" => TargetProperty::Visibility,
            other => TargetProperty::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for TargetProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed keyframe storage of a curve.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveData {
    Scalar(KeyframeTrack<f32>),
    Vector2(KeyframeTrack<Vec2>),
    Vector3(KeyframeTrack<Vec3>),
    Quaternion(KeyframeTrack<Quat>),
    Color3(KeyframeTrack<Vec3>),
    Color4(KeyframeTrack<Vec4>),
    Matrix(KeyframeTrack<Mat4>),
}

/// Runs `$body` with `$t` bound to the inner track, whatever its type.
macro_rules! with_track {
    ($data:expr, $t:ident => $body:expr) => {
        match $data {
            CurveData::Scalar($t) => $body,
            CurveData::Vector2($t) => $body,
            CurveData::Vector3($t) => $body,
            CurveData::Quaternion($t) => $body,
            CurveData::Color3($t) => $body,
            CurveData::Color4($t) => $body,
            CurveData::Matrix($t) => $body,
        }
    };
}

/// Like `with_track!`, but wraps the sampled value back into a [`CurveValue`].
macro_rules! sample_track {
    ($data:expr, $t:ident => $body:expr) => {
        match $data {
            CurveData::Scalar($t) => $body.map(CurveValue::Scalar),
            CurveData::Vector2($t) => $body.map(CurveValue::Vector2),
            CurveData::Vector3($t) => $body.map(CurveValue::Vector3),
            CurveData::Quaternion($t) => $body.map(CurveValue::Quaternion),
            CurveData::Color3($t) => $body.map(CurveValue::Color3),
            CurveData::Color4($t) => $body.map(CurveValue::Color4),
            CurveData::Matrix($t) => $body.map(CurveValue::Matrix),
        }
    };
}

pub(crate) use with_track;

impl CurveData {
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            CurveData::Scalar(_) => ValueType::Scalar,
            CurveData::Vector2(_) => ValueType::Vector2,
            CurveData::Vector3(_) => ValueType::Vector3,
            CurveData::Quaternion(_) => ValueType::Quaternion,
            CurveData::Color3(_) => ValueType::Color3,
            CurveData::Color4(_) => ValueType::Color4,
            CurveData::Matrix(_) => ValueType::Matrix,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        with_track!(self, t => t.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn times(&self) -> &[f32] {
        with_track!(self, t => t.times.as_slice())
    }

    #[must_use]
    pub fn interpolation(&self) -> InterpolationMode {
        with_track!(self, t => t.interpolation)
    }

    #[must_use]
    pub fn sample(&self, frame: f32) -> Option<CurveValue> {
        sample_track!(self, t => t.sample(frame))
    }

    #[must_use]
    pub fn sample_linear(&self, frame: f32) -> Option<CurveValue> {
        sample_track!(self, t => t.sample_linear(frame))
    }

    pub fn sample_with_cursor(&self, frame: f32, cursor: &mut KeyframeCursor) -> Option<CurveValue> {
        sample_track!(self, t => t.sample_with_cursor(frame, cursor))
    }

    pub fn map_frames(&mut self, f: impl FnMut(f32) -> f32) {
        with_track!(self, t => t.map_frames(f));
    }

    /// Builds linear keyframe data from sampled values of one type.
    pub fn from_samples(value_type: ValueType, frames: Vec<f32>, values: &[CurveValue]) -> Result<Self> {
        macro_rules! collect {
            ($variant:ident) => {{
                let typed = values
                    .iter()
                    .map(|v| match v {
                        CurveValue::$variant(x) => Ok(*x),
                        other => Err(Error::MixedValueTypes(value_type, other.value_type())),
                    })
                    .collect::<Result<Vec<_>>>()?;
                CurveData::$variant(KeyframeTrack::try_new(frames, typed, InterpolationMode::Linear)?)
            }};
        }

        Ok(match value_type {
            ValueType::Scalar => collect!(Scalar),
            ValueType::Vector2 => collect!(Vector2),
            ValueType::Vector3 => collect!(Vector3),
            ValueType::Quaternion => collect!(Quaternion),
            ValueType::Color3 => collect!(Color3),
            ValueType::Color4 => collect!(Color4),
            ValueType::Matrix => collect!(Matrix),
        })
    }

    /// Appends the keys of `other`, which must have the same type and start
    /// after this curve's last key.
    pub fn append(&mut self, other: &CurveData) -> Result<()> {
        match (self, other) {
            (CurveData::Scalar(a), CurveData::Scalar(b)) => a.append(b),
            (CurveData::Vector2(a), CurveData::Vector2(b)) => a.append(b),
            (CurveData::Vector3(a), CurveData::Vector3(b)) => a.append(b),
            (CurveData::Quaternion(a), CurveData::Quaternion(b)) => a.append(b),
            (CurveData::Color3(a), CurveData::Color3(b)) => a.append(b),
            (CurveData::Color4(a), CurveData::Color4(b)) => a.append(b),
            (CurveData::Matrix(a), CurveData::Matrix(b)) => a.append(b),
            (a, b) => Err(Error::MixedValueTypes(a.value_type(), b.value_type())),
        }
    }
}

/// Per-curve weight ramp settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveBlending {
    pub enabled: bool,
    /// Fraction of the remaining weight distance covered per frame.
    pub speed: f32,
}

impl Default for CurveBlending {
    fn default() -> Self {
        Self {
            enabled: false,
            speed: 0.01,
        }
    }
}

/// An animation curve: typed keyframes plus the property they drive.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub name: String,
    pub property: TargetProperty,
    pub data: CurveData,
    /// Frames per second of the key positions.
    pub frame_rate: f32,
    pub loop_mode: LoopMode,
    pub blending: CurveBlending,
}

impl Curve {
    #[must_use]
    pub fn new(name: impl Into<String>, property: TargetProperty, data: CurveData, frame_rate: f32) -> Self {
        Self {
            name: name.into(),
            property,
            data,
            frame_rate,
            loop_mode: LoopMode::Loop,
            blending: CurveBlending::default(),
        }
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.data.value_type()
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn first_frame(&self) -> Option<f32> {
        self.data.times().first().copied()
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<f32> {
        self.data.times().last().copied()
    }

    /// Whether `frame` lies within this curve's own keyed span.
    #[must_use]
    pub fn covers(&self, frame: f32) -> bool {
        match (self.first_frame(), self.last_frame()) {
            (Some(first), Some(last)) => frame >= first && frame <= last,
            _ => false,
        }
    }

    #[must_use]
    pub fn sample(&self, frame: f32) -> Option<CurveValue> {
        self.data.sample(frame)
    }

    pub fn validate(&self) -> Result<()> {
        with_track!(&self.data, t => t.validate())
    }
}
