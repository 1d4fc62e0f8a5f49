use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Value types a curve may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Scalar,
    Vector2,
    Vector3,
    Quaternion,
    Color3,
    Color4,
    Matrix,
}

impl ValueType {
    /// Whether [`crate::blend::CurveBlender`] can combine curves of this type.
    #[must_use]
    pub fn is_blendable(self) -> bool {
        !matches!(self, ValueType::Matrix)
    }
}

/// A single sampled value, tagged with its type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveValue {
    Scalar(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Quaternion(Quat),
    Color3(Vec3),
    Color4(Vec4),
    Matrix(Mat4),
}

impl CurveValue {
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            CurveValue::Scalar(_) => ValueType::Scalar,
            CurveValue::Vector2(_) => ValueType::Vector2,
            CurveValue::Vector3(_) => ValueType::Vector3,
            CurveValue::Quaternion(_) => ValueType::Quaternion,
            CurveValue::Color3(_) => ValueType::Color3,
            CurveValue::Color4(_) => ValueType::Color4,
            CurveValue::Matrix(_) => ValueType::Matrix,
        }
    }
}

pub trait Interpolatable: Copy + Clone + Sized + PartialEq + std::fmt::Debug {
    /// Additive identity, used for missing cubic tangents.
    fn zero() -> Self;

    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;

    fn interpolate_cubic(
        v0: Self,
        out_tangent0: Self,
        in_tangent1: Self,
        v1: Self,
        t: f32,
        dt: f32,
    ) -> Self;
}

/// Hermite basis `[s0, s1, s2, s3]` for value0, tangent0, value1, tangent1.
#[inline]
fn hermite(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    let s2 = -2.0 * t3 + 3.0 * t2;
    let s3 = t3 - t2;
    let s0 = 1.0 - s2;
    let s1 = s3 - t2 + t;
    [s0, s1, s2, s3]
}

macro_rules! impl_vector_interpolatable {
    ($ty:ty, $zero:expr) => {
        impl Interpolatable for $ty {
            fn zero() -> Self {
                $zero
            }

            fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
                start + (end - start) * t
            }

            fn interpolate_cubic(
                v0: Self,
                out_tangent0: Self,
                in_tangent1: Self,
                v1: Self,
                t: f32,
                dt: f32,
            ) -> Self {
                let [s0, s1, s2, s3] = hermite(t);
                v0 * s0 + out_tangent0 * (dt * s1) + v1 * s2 + in_tangent1 * (dt * s3)
            }
        }
    };
}

impl_vector_interpolatable!(f32, 0.0);
impl_vector_interpolatable!(Vec2, Vec2::ZERO);
impl_vector_interpolatable!(Vec3, Vec3::ZERO);
impl_vector_interpolatable!(Vec4, Vec4::ZERO);

impl Interpolatable for Quat {
    fn zero() -> Self {
        Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)
    }

    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }

    fn interpolate_cubic(
        v0: Self,
        out_tangent0: Self,
        in_tangent1: Self,
        v1: Self,
        t: f32,
        dt: f32,
    ) -> Self {
        let [s0, s1, s2, s3] = hermite(t);
        let result = Vec4::from(v0) * s0
            + Vec4::from(out_tangent0) * (dt * s1)
            + Vec4::from(v1) * s2
            + Vec4::from(in_tangent1) * (dt * s3);

        Quat::from_vec4(result).normalize()
    }
}

impl Interpolatable for Mat4 {
    fn zero() -> Self {
        Mat4::ZERO
    }

    /// Decomposes both matrices and interpolates scale, rotation and
    /// translation separately.
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        let (s0, r0, t0) = start.to_scale_rotation_translation();
        let (s1, r1, t1) = end.to_scale_rotation_translation();
        Mat4::from_scale_rotation_translation(s0.lerp(s1, t), r0.slerp(r1, t), t0.lerp(t1, t))
    }

    // Matrix tangents have no meaningful Hermite form.
    fn interpolate_cubic(
        v0: Self,
        _out_tangent0: Self,
        _in_tangent1: Self,
        v1: Self,
        t: f32,
        _dt: f32,
    ) -> Self {
        Self::interpolate_linear(v0, v1, t)
    }
}
