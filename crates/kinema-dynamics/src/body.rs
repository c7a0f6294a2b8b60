//! Rigid bodies: pose, momentum, inertia, and the force accumulator.

use glam::Vec3;
use kinema_math::{Aabb, InverseInertia, Pose, SpatialVec};
use kinema_shape::{Shape, ShapeId};

use crate::{MassProperties, MaterialId};

/// Whether a body responds to forces and impulses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Motion {
    /// Integrated every step and moved by contacts.
    Dynamic,
    /// Immovable: infinite mass, never integrated, zero momentum.
    Static,
}

/// A rigid body in world space.
///
/// The body frame sits at the center of mass with axes parallel to the
/// shape frame, so `pose` maps body coordinates to world coordinates and the
/// angular parts of `momentum` and the force accumulator are about the COM.
/// The world-space inverse inertia is kept in step with `pose.rotation`.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBody {
    pub(crate) pose: Pose,
    pub(crate) momentum: SpatialVec,
    pub(crate) force: SpatialVec,
    pub(crate) inverse_inertia_local: InverseInertia,
    pub(crate) inverse_inertia_world: InverseInertia,
    mass: MassProperties,
    shape: ShapeId,
    material: MaterialId,
    shape_offset: Pose,
    motion: Motion,
}

impl RigidBody {
    /// Creates a dynamic body at rest whose shape frame sits at `shape_pose`
    /// in world space. `mass` is expressed in the shape frame.
    pub fn new_dynamic(
        shape: ShapeId,
        material: MaterialId,
        mass: MassProperties,
        shape_pose: Pose,
    ) -> Self {
        let com = mass.center_of_mass;
        let shape_offset = Pose::from_translation(-com);
        let pose = shape_pose * Pose::from_translation(com);
        let inverse_inertia_local = mass.inverse_inertia();
        Self {
            pose,
            momentum: SpatialVec::ZERO,
            force: SpatialVec::ZERO,
            inverse_inertia_local,
            inverse_inertia_world: inverse_inertia_local.rotated(pose.rotation),
            mass,
            shape,
            material,
            shape_offset,
            motion: Motion::Dynamic,
        }
    }

    /// Creates an immovable body whose shape frame sits at `pose`.
    pub fn new_static(shape: ShapeId, material: MaterialId, pose: Pose) -> Self {
        Self {
            pose,
            momentum: SpatialVec::ZERO,
            force: SpatialVec::ZERO,
            inverse_inertia_local: InverseInertia::ZERO,
            inverse_inertia_world: InverseInertia::ZERO,
            mass: MassProperties::ZERO,
            shape,
            material,
            shape_offset: Pose::IDENTITY,
            motion: Motion::Static,
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.translation
    }

    /// World-space momentum; the angular part is about the center of mass.
    pub fn momentum(&self) -> SpatialVec {
        self.momentum
    }

    /// Force and torque accumulated since the last integration.
    pub fn force(&self) -> SpatialVec {
        self.force
    }

    pub fn inverse_inertia_local(&self) -> &InverseInertia {
        &self.inverse_inertia_local
    }

    pub fn inverse_inertia_world(&self) -> &InverseInertia {
        &self.inverse_inertia_world
    }

    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass
    }

    pub fn mass(&self) -> f32 {
        self.mass.mass
    }

    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Transform from the shape frame into the body (COM) frame.
    pub fn shape_offset(&self) -> &Pose {
        &self.shape_offset
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn is_static(&self) -> bool {
        self.motion == Motion::Static
    }

    /// World pose of the shape frame.
    pub fn shape_pose(&self) -> Pose {
        self.pose * self.shape_offset
    }

    /// World-space bounds of `shape` placed at this body's shape pose.
    pub fn world_aabb(&self, shape: &Shape) -> Aabb {
        shape.aabb().transformed(&self.shape_pose())
    }

    /// Teleports the body, re-deriving the world-space inverse inertia.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.refresh_world_inertia();
    }

    /// Overwrites the momentum. Ignored for static bodies.
    pub fn set_momentum(&mut self, momentum: SpatialVec) {
        if !self.is_static() {
            self.momentum = momentum;
        }
    }

    /// Sets the momentum that produces world-space `velocity`.
    pub fn set_velocity(&mut self, velocity: SpatialVec) {
        let mass = self.mass.mass;
        let inertia_world = self.pose.rotation * self.mass.inertia * self.pose.rotation.transpose();
        self.set_momentum(SpatialVec::new(
            velocity.linear * mass,
            inertia_world * velocity.angular,
        ));
    }

    /// Adds a world-space force through the center of mass.
    pub fn apply_force(&mut self, force: Vec3) {
        self.force.linear += force;
    }

    /// Adds a world-space torque about the center of mass.
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.force.angular += torque;
    }

    /// Adds a world-space force acting at world-space `point`, including the
    /// torque of its lever arm about the center of mass.
    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3) {
        self.force += SpatialVec::new(force, Vec3::ZERO).shift(point - self.pose.translation);
    }

    /// Adds a world-space spatial force (torque about the COM).
    pub fn apply_spatial_force(&mut self, force: SpatialVec) {
        self.force += force;
    }

    /// Adds a world-space spatial impulse (angular part about the COM)
    /// directly to the momentum. Ignored for static bodies.
    pub fn apply_impulse(&mut self, impulse: SpatialVec) {
        if !self.is_static() {
            self.momentum += impulse;
        }
    }

    /// Adds a spatial impulse expressed in the body frame.
    pub fn apply_local_impulse(&mut self, impulse: SpatialVec) {
        self.apply_impulse(impulse.rotate(self.pose.rotation));
    }

    /// World-space spatial velocity `I⁻¹·H`.
    pub fn velocity(&self) -> SpatialVec {
        self.inverse_inertia_world.apply(&self.momentum)
    }

    /// World-space velocity of the material point at world `point`.
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        let v = self.velocity();
        v.linear + v.angular.cross(point - self.pose.translation)
    }

    /// `½·V·H`.
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.velocity().dot(&self.momentum)
    }

    pub fn clear_forces(&mut self) {
        self.force = SpatialVec::ZERO;
    }

    /// Returns `true` if the pose, momentum, and force accumulator are finite.
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.momentum.is_finite() && self.force.is_finite()
    }

    pub(crate) fn refresh_world_inertia(&mut self) {
        self.inverse_inertia_world = self.inverse_inertia_local.rotated(self.pose.rotation);
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use glam::Mat3;

    use super::*;

    fn ball() -> RigidBody {
        RigidBody::new_dynamic(
            ShapeId(0),
            MaterialId::DEFAULT,
            MassProperties::solid_sphere(5.0, 1.0),
            Pose::from_translation(Vec3::new(0.0, 0.0, 10.0)),
        )
    }

    /// A 2×1×1 box mass distribution, long along X.
    fn plank_mass() -> MassProperties {
        MassProperties::new(
            6.0,
            Vec3::ZERO,
            Mat3::from_diagonal(Vec3::new(1.0, 2.5, 2.5)),
        )
    }

    #[test]
    fn test_new_dynamic_at_rest() {
        let body = ball();
        assert_eq!(body.position(), Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(body.momentum(), SpatialVec::ZERO);
        assert_eq!(body.kinetic_energy(), 0.0);
        assert_eq!(body.mass(), 5.0);
        assert!((body.inverse_inertia_world().inv_mass - 0.2).abs() < 1e-6);
        assert!(!body.is_static());
    }

    #[test]
    fn test_center_of_mass_offset() {
        let mass = MassProperties::new(1.0, Vec3::new(1.0, 0.0, 0.0), Mat3::IDENTITY);
        let shape_pose = Pose::from_axis_angle(Vec3::Z, FRAC_PI_2);
        let body = RigidBody::new_dynamic(ShapeId(0), MaterialId::DEFAULT, mass, shape_pose);
        // COM at shape-local +X lands on world +Y after the 90° turn.
        assert!(body.position().abs_diff_eq(Vec3::Y, 1e-6));
        assert!(body.shape_pose().abs_diff_eq(&shape_pose, 1e-6));
    }

    #[test]
    fn test_static_body_ignores_impulses() {
        let mut body = RigidBody::new_static(ShapeId(0), MaterialId::DEFAULT, Pose::IDENTITY);
        body.apply_impulse(SpatialVec::new(Vec3::X, Vec3::Y));
        body.set_momentum(SpatialVec::new(Vec3::ONE, Vec3::ONE));
        assert_eq!(body.momentum(), SpatialVec::ZERO);
        assert_eq!(body.velocity(), SpatialVec::ZERO);
        assert!(body.inverse_inertia_world().is_zero());
    }

    #[test]
    fn test_force_accumulation() {
        let mut body = ball();
        body.apply_force(Vec3::X);
        body.apply_force(Vec3::Y);
        body.apply_torque(Vec3::Z);
        assert_eq!(body.force(), SpatialVec::new(Vec3::new(1.0, 1.0, 0.0), Vec3::Z));
        body.clear_forces();
        assert_eq!(body.force(), SpatialVec::ZERO);
    }

    #[test]
    fn test_force_at_point_adds_lever_torque() {
        let mut body = ball();
        let point = body.position() + Vec3::X;
        body.apply_force_at_point(Vec3::Y, point);
        assert_eq!(body.force().linear, Vec3::Y);
        assert!(body.force().angular.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_velocity_and_energy() {
        let mut body = ball();
        body.set_momentum(SpatialVec::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0)));
        let v = body.velocity();
        assert!(v.linear.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
        assert!(v.angular.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
        // ½·(2·10) + ½·(1·2)
        assert!((body.kinetic_energy() - 11.0).abs() < 1e-5);

        let rim = body.position() + Vec3::Y;
        assert!(body
            .velocity_at_point(rim)
            .abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_set_velocity_roundtrips() {
        let mut body = RigidBody::new_dynamic(
            ShapeId(0),
            MaterialId::DEFAULT,
            plank_mass(),
            Pose::from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), 0.7),
        );
        let target = SpatialVec::new(Vec3::new(1.0, -2.0, 0.5), Vec3::new(0.3, 0.1, -0.4));
        body.set_velocity(target);
        assert!(body.velocity().abs_diff_eq(target, 1e-4));
    }

    #[test]
    fn test_local_impulse_is_rotated_into_world() {
        let mut body = RigidBody::new_dynamic(
            ShapeId(0),
            MaterialId::DEFAULT,
            plank_mass(),
            Pose::from_axis_angle(Vec3::Z, FRAC_PI_2),
        );
        body.apply_local_impulse(SpatialVec::new(Vec3::X, Vec3::ZERO));
        assert!(body.momentum().linear.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_set_pose_refreshes_world_inertia() {
        let mut body = RigidBody::new_dynamic(
            ShapeId(0),
            MaterialId::DEFAULT,
            plank_mass(),
            Pose::IDENTITY,
        );
        let before = body.inverse_inertia_world().angular;
        body.set_pose(Pose::from_axis_angle(Vec3::Z, FRAC_PI_2));
        let after = body.inverse_inertia_world().angular;
        // The long axis swapped from X to Y.
        assert!((after.y_axis.y - before.x_axis.x).abs() < 1e-5);
        assert!((after.x_axis.x - before.y_axis.y).abs() < 1e-5);
    }

    #[test]
    fn test_is_finite() {
        let mut body = ball();
        assert!(body.is_finite());
        body.apply_force(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(!body.is_finite());
    }
}
