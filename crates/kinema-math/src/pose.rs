//! Rigid poses (rotation + translation) and rotation helpers.

use std::ops::Mul;

use glam::{Mat3, Vec3};

use crate::EPSILON;

/// Rigid transform mapping object-space points into the parent frame:
/// `p_parent = rotation * p_object + translation`.
///
/// The rotation is kept as a matrix rather than a quaternion because the
/// integrator composes incremental rotations onto it every step and then
/// re-orthonormalizes; see [`Pose::orthonormalized`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Orthonormal rotation from object to parent axes.
    pub rotation: Mat3,
    /// Position of the object origin in the parent frame.
    pub translation: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Create from a rotation matrix and translation.
    pub const fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pure translation.
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Mat3::IDENTITY,
            translation,
        }
    }

    /// Pure rotation.
    pub const fn from_rotation(rotation: Mat3) -> Self {
        Self {
            rotation,
            translation: Vec3::ZERO,
        }
    }

    /// Pure rotation of `angle` radians about the unit `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        Self::from_rotation(Mat3::from_axis_angle(axis, angle))
    }

    /// Maps an object-space point into the parent frame.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// Maps an object-space direction into the parent frame.
    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Maps a parent-frame point into object space.
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.transpose() * (p - self.translation)
    }

    /// Maps a parent-frame direction into object space.
    #[inline]
    pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation.transpose() * v
    }

    /// Inverse transform (parent → object).
    pub fn inverse(&self) -> Pose {
        let rt = self.rotation.transpose();
        Pose {
            rotation: rt,
            translation: -(rt * self.translation),
        }
    }

    /// Returns a copy whose rotation has been re-orthonormalized.
    pub fn orthonormalized(&self) -> Pose {
        Pose {
            rotation: orthonormalize(self.rotation),
            translation: self.translation,
        }
    }

    /// Returns `true` if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.translation.is_finite()
    }

    /// Component-wise comparison within `max_abs_diff`.
    pub fn abs_diff_eq(&self, other: &Pose, max_abs_diff: f32) -> bool {
        self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
            && self.translation.abs_diff_eq(other.translation, max_abs_diff)
    }
}

/// `a * b` applies `b` first, then `a`.
impl Mul for Pose {
    type Output = Pose;
    #[inline]
    fn mul(self, rhs: Pose) -> Pose {
        Pose {
            rotation: self.rotation * rhs.rotation,
            translation: self.rotation * rhs.translation + self.translation,
        }
    }
}

/// Rotation by `|v|` radians about `v`. Vectors shorter than [`EPSILON`]
/// produce the identity.
pub fn rotation_from_vector(v: Vec3) -> Mat3 {
    let angle = v.length();
    if angle.is_nan() || angle <= EPSILON {
        return Mat3::IDENTITY;
    }
    Mat3::from_axis_angle(v / angle, angle)
}

/// Gram–Schmidt re-orthonormalization of a nearly orthonormal rotation.
///
/// The first column keeps its direction, the second is made orthogonal to it,
/// and the third is rebuilt as their cross product so the result stays
/// right-handed. A degenerate input falls back to the identity.
pub fn orthonormalize(m: Mat3) -> Mat3 {
    let x = m.x_axis.normalize_or_zero();
    let y = (m.y_axis - x * x.dot(m.y_axis)).normalize_or_zero();
    if x == Vec3::ZERO || y == Vec3::ZERO {
        return Mat3::IDENTITY;
    }
    Mat3::from_cols(x, y, x.cross(y))
}
