//! Midpoint-inertia integration of a single rigid body.
//!
//! World-space inertia depends on orientation, which changes during the step.
//! The integrator therefore evaluates the velocity with an inverse inertia
//! estimated at the temporal midpoint, while the momentum itself receives the
//! full impulse `F·dt`. Rotations are composed onto the pose (never added)
//! and re-orthonormalized afterwards.

use kinema_math::{InverseInertia, Pose, SpatialVec, orthonormalize, rotation_from_vector};

use crate::RigidBody;
use crate::error::{PhysicsError, Result};

/// Midpoint refinement passes used by [`evolve`].
pub const DEFAULT_REFINEMENT_PASSES: u32 = 1;

/// Advances `body` by `dt` seconds with one midpoint refinement pass and
/// clears its force accumulator.
///
/// # Errors
///
/// [`PhysicsError::InvalidArgument`] if `dt` is not a positive finite number
/// or the body's pose, momentum, or accumulated force is non-finite. The body
/// is left untouched on error.
pub fn evolve(body: &mut RigidBody, dt: f32) -> Result<()> {
    evolve_with(body, dt, DEFAULT_REFINEMENT_PASSES)
}

/// [`evolve`] with an explicit number of midpoint inertia refinement passes.
/// Zero passes evaluates the velocity with the start-of-step inertia.
pub fn evolve_with(body: &mut RigidBody, dt: f32, passes: u32) -> Result<()> {
    check_step(body, dt)?;
    if body.is_static() {
        body.clear_forces();
        return Ok(());
    }

    let force = body.force;
    let h0 = body.momentum;
    let r0 = body.pose.rotation;

    let h_mid = h0 + force * (0.5 * dt);
    let mut inverse_inertia_mid = body.inverse_inertia_world;
    for _ in 0..passes {
        let v = inverse_inertia_mid.apply(&h_mid);
        let half_rotation = rotation_from_vector(v.angular * (0.5 * dt));
        inverse_inertia_mid = body.inverse_inertia_local.rotated(half_rotation * r0);
    }

    let delta = inverse_inertia_mid.apply(&h_mid) * dt;
    let h1 = h0 + force * dt;

    let r1 = orthonormalize(rotation_from_vector(delta.angular) * r0);
    body.pose = Pose::new(r1, body.pose.translation + delta.linear);
    body.momentum = h1;
    body.refresh_world_inertia();
    body.clear_forces();

    tracing::trace!(
        dt,
        passes,
        displacement = ?delta,
        momentum = ?h1,
        "body integrated"
    );
    Ok(())
}

/// Kinetic energy gained over `dt` under constant `force`, evaluated with a
/// fixed `inertia_inv`: `½·(V₁·H₁ − V₀·H₀)` where `H₁ = H₀ + F·dt` and
/// `Vᵢ = I⁻¹·Hᵢ`.
///
/// Compute it before stepping; for a body whose world inertia does not change
/// over the step, `KE_after == KE_before + kinetic_energy_change(..)`.
pub fn kinetic_energy_change(
    force: &SpatialVec,
    momentum: &SpatialVec,
    inertia_inv: &InverseInertia,
    dt: f32,
) -> f32 {
    let h1 = *momentum + *force * dt;
    let v0 = inertia_inv.apply(momentum);
    let v1 = inertia_inv.apply(&h1);
    0.5 * (v1.dot(&h1) - v0.dot(momentum))
}

fn check_step(body: &RigidBody, dt: f32) -> Result<()> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(PhysicsError::invalid(format!(
            "time step must be positive and finite, got {dt}"
        )));
    }
    if !body.is_finite() {
        return Err(PhysicsError::invalid(
            "body pose, momentum, or force is not finite",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "integrator_tests.rs"]
mod tests;
