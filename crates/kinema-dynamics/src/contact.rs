//! Contacts and the restitution/friction impulse resolver.
//!
//! A contact is authored in body A's frame (origin at A's center of mass).
//! The resolver builds the effective inverse inertia of both bodies at the
//! contact point in that frame, solves for the impulse that cancels the
//! relative velocity, adds restitution along the normal, clamps the
//! tangential part to the friction cone, and returns one spatial impulse per
//! body, each in its own body frame.

use glam::{Mat3, Vec3};
use kinema_math::{EPSILON, InverseInertia, SpatialVec, skew, try_inverse};

use crate::error::{PhysicsError, Result};
use crate::{Material, RigidBody};

/// Largest usable friction coefficient. Coefficients approaching 1 map to
/// an infinitely steep cone.
pub const MAX_FRICTION: f32 = 0.999;

/// Largest normal relative speed still treated as approaching.
pub const APPROACH_TOLERANCE: f32 = 1.0e-5;

/// Contact geometry produced by a narrow phase.
///
/// `point` and `axis` are expressed in the frame the narrow phase was given
/// for the first shape; `axis` is a unit vector pointing from the first
/// shape towards the second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPoint {
    pub point: Vec3,
    pub axis: Vec3,
    /// Penetration depth along `axis`; positive when overlapping.
    pub depth: f32,
}

/// A contact between two bodies, ready for impulse resolution.
///
/// `point`, `axis`, and `relative_velocity` are in body A's frame.
#[derive(Clone, Copy, Debug)]
pub struct Contact<'a> {
    pub body_a: &'a RigidBody,
    pub body_b: &'a RigidBody,
    pub point: Vec3,
    /// Unit separating axis pointing from A to B.
    pub axis: Vec3,
    pub depth: f32,
    /// Velocity of B's material point minus A's at `point`.
    pub relative_velocity: Vec3,
    pub material: Material,
}

impl<'a> Contact<'a> {
    /// Builds a contact from body-A-frame geometry, deriving the relative
    /// velocity from the two bodies' current momenta.
    pub fn new(
        body_a: &'a RigidBody,
        body_b: &'a RigidBody,
        geometry: ContactPoint,
        material: Material,
    ) -> Self {
        let pose_a = body_a.pose();
        let world_point = pose_a.transform_point(geometry.point);
        let relative = body_b.velocity_at_point(world_point) - body_a.velocity_at_point(world_point);
        Self {
            body_a,
            body_b,
            point: geometry.point,
            axis: geometry.axis,
            depth: geometry.depth,
            relative_velocity: pose_a.inverse_transform_vector(relative),
            material,
        }
    }

    /// Relative velocity along the axis; negative while the bodies close in.
    pub fn normal_velocity(&self) -> f32 {
        self.axis.dot(self.relative_velocity)
    }

    pub fn is_approaching(&self) -> bool {
        self.normal_velocity() <= APPROACH_TOLERANCE
    }

    fn is_finite(&self) -> bool {
        self.point.is_finite()
            && self.axis.is_finite()
            && self.depth.is_finite()
            && self.relative_velocity.is_finite()
            && self.body_a.is_finite()
            && self.body_b.is_finite()
    }
}

/// Equal and opposite spatial impulses for the two bodies of a contact.
///
/// Each impulse is expressed in its own body's frame with the angular part
/// about that body's center of mass, ready for
/// [`RigidBody::apply_local_impulse`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImpulsePair {
    pub on_a: SpatialVec,
    pub on_b: SpatialVec,
}

/// Maps a friction coefficient in `[0, 1)` onto a cone slope in `[0, ∞)`.
/// The coefficient is clamped to `[0, MAX_FRICTION]` first.
pub fn friction_cone_slope(friction: f32) -> f32 {
    let mu = if friction.is_nan() {
        0.0
    } else {
        friction.clamp(0.0, MAX_FRICTION)
    };
    mu / (1.0 - mu)
}

/// Effective inverse inertia of one body at lever arm `r` from its center
/// of mass: `(1/m)·I − [r]ₓ·I⁻¹·[r]ₓ`. Maps an impulse applied at the point
/// to the velocity change of that material point.
pub fn collision_inverse_inertia(inertia_inv: &InverseInertia, r: Vec3) -> Mat3 {
    let r_cross = skew(r);
    Mat3::from_diagonal(Vec3::splat(inertia_inv.inv_mass)) - r_cross * inertia_inv.angular * r_cross
}

/// Computes the impulse pair that reverses the normal relative velocity
/// scaled by the material's normal elasticity, with the tangential impulse
/// held inside the static-friction cone.
///
/// # Errors
///
/// [`PhysicsError::InvalidArgument`] when the bodies are separating along the
/// axis, the axis has zero length, or any input is non-finite.
pub fn restitution_impulse(contact: &Contact<'_>) -> Result<ImpulsePair> {
    if !contact.is_finite() {
        return Err(PhysicsError::invalid("contact has non-finite values"));
    }
    let n = contact.axis.normalize_or_zero();
    if n == Vec3::ZERO {
        return Err(PhysicsError::invalid("contact axis has zero length"));
    }
    let v_rel = contact.relative_velocity;
    let vn = n.dot(v_rel);
    if vn > APPROACH_TOLERANCE {
        return Err(PhysicsError::invalid(format!(
            "contact is separating (normal velocity {vn})"
        )));
    }

    let (a, b) = (contact.body_a, contact.body_b);
    let rot_a = a.pose().rotation;
    let to_a = rot_a.transpose();

    // Body B's center of mass and inertia expressed in A's frame.
    let origin_b = to_a * (b.position() - a.position());
    let r_a = contact.point;
    let r_b = contact.point - origin_b;
    let inv_b = b.inverse_inertia_world().rotated(to_a);

    let k = collision_inverse_inertia(a.inverse_inertia_local(), r_a)
        + collision_inverse_inertia(&inv_b, r_b);
    // K scales with inverse mass; every guard below is relative to its trace.
    let scale = (k.x_axis.x + k.y_axis.y + k.z_axis.z) / 3.0;
    let impulse0 = if scale.is_finite() && scale > 0.0 {
        try_inverse(k * (1.0 / scale))
            .map(|inv| -(inv * v_rel) / scale)
            .unwrap_or(Vec3::ZERO)
    } else {
        Vec3::ZERO
    };

    let denominator = n.dot(k * n);
    let normal = if scale > 0.0 && denominator > EPSILON * scale {
        n * (-vn / denominator)
    } else {
        Vec3::ZERO
    };
    let normal = normal * (1.0 + contact.material.elasticity_normal);

    let mut tangential = impulse0 - n * n.dot(impulse0);
    let limit = friction_cone_slope(contact.material.static_friction) * normal.length();
    let tangential_len = tangential.length();
    if tangential_len > limit {
        tangential = if limit > 0.0 {
            tangential * (limit / tangential_len)
        } else {
            Vec3::ZERO
        };
    }

    let impulse = normal + tangential;
    let on_a = SpatialVec::new(-impulse, Vec3::ZERO).shift(r_a);
    let on_b = SpatialVec::new(impulse, Vec3::ZERO)
        .shift(r_b)
        .rotate(b.pose().rotation.transpose() * rot_a);

    tracing::trace!(
        normal_velocity = vn,
        normal = ?normal,
        tangential = ?tangential,
        "contact impulse"
    );
    Ok(ImpulsePair { on_a, on_b })
}

#[cfg(test)]
#[path = "contact_tests.rs"]
mod tests;
