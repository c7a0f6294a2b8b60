//! Spatial algebra, rigid poses, and bounding boxes for the Kinema physics kernel.
//!
//! Spatial vectors are stored as `[linear; angular]`. A momentum or force vector
//! keeps its angular part referenced to the body's center of mass.

mod aabb;
mod pose;
mod spatial;

pub use aabb::Aabb;
pub use pose::{Pose, orthonormalize, rotation_from_vector};
pub use spatial::{InverseInertia, SpatialVec};

pub use glam::{Mat3, Vec3};

/// Values whose magnitude is at or below this are treated as zero by guarded
/// numeric branches (normalization, division, matrix inversion).
pub const EPSILON: f32 = 1.0e-6;

/// Cross-product matrix: `skew(v) * w == v.cross(w)`.
#[inline]
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Outer product `a bᵀ`.
#[inline]
pub fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Inverts a 3x3 matrix, returning `None` when it is singular.
pub fn try_inverse(m: Mat3) -> Option<Mat3> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() <= EPSILON * EPSILON {
        return None;
    }
    let inv = m.inverse();
    inv.is_finite().then_some(inv)
}
