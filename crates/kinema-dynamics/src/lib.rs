//! Rigid-body dynamics: mass properties, materials, bodies, the midpoint
//! inertia integrator, the restitution/friction impulse resolver, and a
//! caller-owned [`PhysicsWorld`].
//!
//! Bodies carry world-space momentum rather than velocity. Velocity is
//! always derived as `I⁻¹·H`, so impulses and forces are applied by adding
//! to momentum, and linear and angular momentum are conserved exactly across
//! a free integration step.

mod body;
mod contact;
mod error;
mod integrator;
mod mass;
mod material;
mod world;

pub use body::{Motion, RigidBody};
pub use contact::{
    APPROACH_TOLERANCE, Contact, ContactPoint, ImpulsePair, MAX_FRICTION,
    collision_inverse_inertia, friction_cone_slope, restitution_impulse,
};
pub use error::{PhysicsError, Result};
pub use integrator::{DEFAULT_REFINEMENT_PASSES, evolve, evolve_with, kinetic_energy_change};
pub use mass::MassProperties;
pub use material::{Material, MaterialId, MaterialRegistry};
pub use world::{
    AabbBroadPhase, BodyHandle, BroadPhase, NarrowPhase, PhysicsWorld, Proxy, StepReport,
    physics_step_system,
};
