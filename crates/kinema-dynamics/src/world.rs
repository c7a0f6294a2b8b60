//! Caller-owned simulation world.
//!
//! A [`PhysicsWorld`] owns the shapes, materials, and bodies of one
//! simulation and advances them with [`PhysicsWorld::step`]. Independent
//! worlds share nothing, so several can run on separate threads.
//!
//! Collision detection is split in two seams: a [`BroadPhase`] that proposes
//! candidate pairs from world-space bounds, and a caller-supplied
//! [`NarrowPhase`] that turns a candidate pair into contact geometry.

use bevy_ecs::prelude::*;
use glam::Vec3;
use kinema_config::{Config, SimulationConfig};
use kinema_math::{Aabb, EPSILON, Pose, SpatialVec};
use kinema_shape::{Shape, ShapeArena, ShapeFlags, ShapeId};
use rustc_hash::FxHashMap;

use crate::contact::{Contact, ContactPoint, restitution_impulse};
use crate::error::{PhysicsError, Result};
use crate::integrator::{evolve_with, kinetic_energy_change};
use crate::{MassProperties, Material, MaterialId, MaterialRegistry, RigidBody};

/// Generational reference to a body in a [`PhysicsWorld`].
///
/// Removing a body bumps its slot's generation, so handles to the removed
/// body are rejected even after the slot is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    pub index: u32,
    pub generation: u32,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    body: Option<RigidBody>,
}

/// World-space bounds of one body, as seen by a [`BroadPhase`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Proxy {
    pub handle: BodyHandle,
    pub aabb: Aabb,
    pub is_static: bool,
}

/// Proposes body pairs whose shapes may touch.
pub trait BroadPhase: Send + Sync {
    /// Returns candidate pairs. Pairs of two static bodies need not be
    /// reported; the world never resolves them.
    fn find_pairs(&mut self, proxies: &[Proxy]) -> Vec<(BodyHandle, BodyHandle)>;
}

/// Brute-force bounds overlap test over every pair of proxies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AabbBroadPhase {
    /// Distance every box is inflated by before testing.
    pub margin: f32,
}

impl AabbBroadPhase {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }
}

impl BroadPhase for AabbBroadPhase {
    fn find_pairs(&mut self, proxies: &[Proxy]) -> Vec<(BodyHandle, BodyHandle)> {
        let mut pairs = Vec::new();
        for (i, a) in proxies.iter().enumerate() {
            let aabb_a = a.aabb.expand_by(self.margin);
            for b in &proxies[i + 1..] {
                if a.is_static && b.is_static {
                    continue;
                }
                if aabb_a.intersects(&b.aabb.expand_by(self.margin)) {
                    pairs.push((a.handle, b.handle));
                }
            }
        }
        pairs
    }
}

/// Exact contact generation between two placed shapes.
///
/// `pose_a` and `pose_b` are the world poses of each shape's parent frame;
/// the shape's own `local` pose still has to be applied. A returned
/// [`ContactPoint`] is expressed in `pose_a`'s frame with the axis pointing
/// from the first shape towards the second.
pub trait NarrowPhase {
    fn collide(
        &self,
        shape_a: &Shape,
        pose_a: &Pose,
        shape_b: &Shape,
        pose_b: &Pose,
    ) -> Option<ContactPoint>;
}

impl<F> NarrowPhase for F
where
    F: Fn(&Shape, &Pose, &Shape, &Pose) -> Option<ContactPoint>,
{
    fn collide(
        &self,
        shape_a: &Shape,
        pose_a: &Pose,
        shape_b: &Shape,
        pose_b: &Pose,
    ) -> Option<ContactPoint> {
        self(shape_a, pose_a, shape_b, pose_b)
    }
}

/// What one call to [`PhysicsWorld::step`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub bodies_integrated: usize,
    pub candidate_pairs: usize,
    /// Pairs for which the narrow phase produced contact geometry.
    pub contacts: usize,
    pub impulses_applied: usize,
    pub separating_skipped: usize,
    /// Contacts involving a sensor shape; detected but not resolved.
    pub sensor_contacts: usize,
    pub energy_violations: usize,
}

/// Shapes, materials, and bodies of one simulation.
///
/// Insert into the ECS world as a resource and drive it with
/// [`physics_step_system`], or own it directly and call [`step`](Self::step).
#[derive(Resource)]
pub struct PhysicsWorld {
    config: SimulationConfig,
    gravity: Vec3,
    shapes: ShapeArena,
    materials: MaterialRegistry,
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    broad_phase: Box<dyn BroadPhase>,
    energy_checks: bool,
}

impl PhysicsWorld {
    /// Creates an empty world. The default material is built from the
    /// configured density, friction, and elasticity.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            gravity: Vec3::from_array(config.gravity),
            materials: MaterialRegistry::new(Material::from_config(&config)),
            config,
            shapes: ShapeArena::new(),
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            broad_phase: Box::new(AabbBroadPhase::default()),
            energy_checks: false,
        }
    }

    /// Creates a world from a full configuration, honouring
    /// `debug.energy_checks`.
    pub fn from_config(config: &Config) -> Self {
        let mut world = Self::new(config.simulation.clone());
        world.energy_checks = config.debug.energy_checks;
        world
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// # Errors
    ///
    /// [`PhysicsError::InvalidArgument`] if `gravity` is not finite; the
    /// previous gravity is kept.
    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        if !gravity.is_finite() {
            return Err(PhysicsError::invalid(format!(
                "gravity must be finite, got {gravity}"
            )));
        }
        self.gravity = gravity;
        Ok(())
    }

    /// Replaces the broad phase used by subsequent steps.
    pub fn set_broad_phase(&mut self, broad_phase: impl BroadPhase + 'static) {
        self.broad_phase = Box::new(broad_phase);
    }

    pub fn energy_checks(&self) -> bool {
        self.energy_checks
    }

    /// Enables per-body comparison of predicted and actual kinetic energy
    /// change on every step.
    pub fn set_energy_checks(&mut self, enabled: bool) {
        self.energy_checks = enabled;
    }

    pub fn shapes(&self) -> &ShapeArena {
        &self.shapes
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        self.shapes.insert(shape)
    }

    /// Registers a material. See [`MaterialRegistry::register`].
    pub fn add_material(&mut self, material: Material) -> Result<MaterialId> {
        self.materials.register(material)
    }

    /// Adds a dynamic body at rest whose shape frame sits at `shape_pose`.
    /// Mass properties come from the shape and the material's density.
    ///
    /// # Errors
    ///
    /// - [`PhysicsError::UnknownShape`] / [`PhysicsError::UnknownMaterial`]
    ///   for ids this world never issued.
    /// - [`PhysicsError::InvalidArgument`] if the shape is `STATIC_ONLY`,
    ///   has no mass at this density, or the pose is non-finite.
    pub fn add_body(
        &mut self,
        shape: ShapeId,
        material: MaterialId,
        shape_pose: Pose,
    ) -> Result<BodyHandle> {
        let geometry = self.shapes.get(shape).ok_or(PhysicsError::UnknownShape(shape))?;
        let density = self.materials.try_get(material)?.density;
        if geometry.flags.contains(ShapeFlags::STATIC_ONLY) {
            return Err(PhysicsError::invalid(format!(
                "shape {shape:?} may only be used by static bodies"
            )));
        }
        if !geometry.is_finite() || !shape_pose.is_finite() {
            return Err(PhysicsError::invalid("body shape or pose is not finite"));
        }

        let mass = MassProperties::from_shape(geometry, density);
        if !mass.is_finite() || mass.mass <= EPSILON {
            return Err(PhysicsError::invalid(format!(
                "shape {shape:?} has no mass at density {density}"
            )));
        }
        Ok(self.insert(RigidBody::new_dynamic(shape, material, mass, shape_pose)))
    }

    /// Adds an immovable body whose shape frame sits at `pose`.
    pub fn add_static_body(
        &mut self,
        shape: ShapeId,
        material: MaterialId,
        pose: Pose,
    ) -> Result<BodyHandle> {
        if self.shapes.get(shape).is_none() {
            return Err(PhysicsError::UnknownShape(shape));
        }
        self.materials.try_get(material)?;
        if !pose.is_finite() {
            return Err(PhysicsError::invalid("static body pose is not finite"));
        }
        Ok(self.insert(RigidBody::new_static(shape, material, pose)))
    }

    /// Removes a body and returns it. The handle becomes stale.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(PhysicsError::StaleHandle(handle))?;
        let body = slot.body.take().ok_or(PhysicsError::StaleHandle(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        tracing::debug!(index = handle.index, "body removed");
        Ok(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
            .ok_or(PhysicsError::StaleHandle(handle))
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
            .ok_or(PhysicsError::StaleHandle(handle))
    }

    /// Iterates over live bodies in slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let handle = BodyHandle {
                index: index as u32,
                generation: slot.generation,
            };
            slot.body.as_ref().map(|body| (handle, body))
        })
    }

    /// Number of live bodies.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Accumulates a world-space force through the body's center of mass.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3) -> Result<()> {
        self.body_mut(handle)?.apply_force(force);
        Ok(())
    }

    /// Adds a world-space spatial impulse (angular part about the COM).
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: SpatialVec) -> Result<()> {
        self.body_mut(handle)?.apply_impulse(impulse);
        Ok(())
    }

    /// Total momentum of all bodies with the angular part about the world
    /// origin.
    pub fn total_momentum(&self) -> SpatialVec {
        self.bodies().fold(SpatialVec::ZERO, |total, (_, body)| {
            total + body.momentum().shift(body.position())
        })
    }

    pub fn total_kinetic_energy(&self) -> f32 {
        self.bodies().map(|(_, body)| body.kinetic_energy()).sum()
    }

    /// Advances the world by `dt`.
    ///
    /// Gravity is accumulated on every dynamic body, all bodies are
    /// integrated, and contacts found by the broad and narrow phases are
    /// resolved one pair at a time in broad-phase order. Separating and
    /// sensor contacts are counted but not resolved.
    ///
    /// # Errors
    ///
    /// [`PhysicsError::InvalidArgument`] if `dt` is not positive and finite
    /// or any body is non-finite. Validation happens before anything is
    /// mutated.
    pub fn step<N>(&mut self, dt: f32, narrow_phase: &N) -> Result<StepReport>
    where
        N: NarrowPhase + ?Sized,
    {
        self.validate_bodies(dt)?;
        let mut report = StepReport::default();
        let gravity = self.gravity;
        let passes = self.config.inertia_refinement_passes;

        for slot in &mut self.slots {
            if let Some(body) = slot.body.as_mut().filter(|body| !body.is_static()) {
                let weight = gravity * body.mass();
                body.apply_force(weight);
            }
        }

        let predicted = if self.energy_checks {
            self.predict_energies(dt)
        } else {
            FxHashMap::default()
        };

        for slot in &mut self.slots {
            if let Some(body) = slot.body.as_mut() {
                evolve_with(body, dt, passes)?;
                if !body.is_static() {
                    report.bodies_integrated += 1;
                }
            }
        }

        if self.energy_checks {
            report.energy_violations = self.check_energies(&predicted, dt);
        }

        let proxies = self.proxies()?;
        let pairs = self.broad_phase.find_pairs(&proxies);
        report.candidate_pairs = pairs.len();
        for (a, b) in pairs {
            self.resolve_pair(a, b, narrow_phase, &mut report)?;
        }

        tracing::debug!(
            dt,
            bodies = report.bodies_integrated,
            pairs = report.candidate_pairs,
            contacts = report.contacts,
            impulses = report.impulses_applied,
            separating = report.separating_skipped,
            sensors = report.sensor_contacts,
            "physics step"
        );
        Ok(report)
    }

    fn insert(&mut self, body: RigidBody) -> BodyHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.body = Some(body);
                BodyHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    body: Some(body),
                });
                BodyHandle {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.len += 1;
        tracing::debug!(
            index = handle.index,
            generation = handle.generation,
            "body added"
        );
        handle
    }

    fn shape(&self, id: ShapeId) -> Result<&Shape> {
        self.shapes.get(id).ok_or(PhysicsError::UnknownShape(id))
    }

    fn validate_bodies(&self, dt: f32) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PhysicsError::invalid(format!(
                "time step must be positive and finite, got {dt}"
            )));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::invalid(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        for (handle, body) in self.bodies() {
            if !body.is_finite() {
                return Err(PhysicsError::invalid(format!(
                    "body {} has a non-finite pose, momentum, or force",
                    handle.index
                )));
            }
            if !body.is_static() && !(body.force().linear + self.gravity * body.mass()).is_finite()
            {
                return Err(PhysicsError::invalid(format!(
                    "body {} overflows when gravity is applied",
                    handle.index
                )));
            }
            self.shape(body.shape())?;
            self.materials.try_get(body.material())?;
        }
        Ok(())
    }

    /// Kinetic energy each dynamic body should have after this step, keyed by
    /// slot index. Must run after external forces are accumulated.
    fn predict_energies(&self, dt: f32) -> FxHashMap<u32, f32> {
        self.bodies()
            .filter(|(_, body)| !body.is_static())
            .map(|(handle, body)| {
                let change = kinetic_energy_change(
                    &body.force(),
                    &body.momentum(),
                    body.inverse_inertia_world(),
                    dt,
                );
                (handle.index, body.kinetic_energy() + change)
            })
            .collect()
    }

    fn check_energies(&self, predicted: &FxHashMap<u32, f32>, dt: f32) -> usize {
        let mut violations = 0;
        for (handle, body) in self.bodies() {
            let Some(&expected) = predicted.get(&handle.index) else {
                continue;
            };
            let actual = body.kinetic_energy();
            let scale = expected.abs().max(actual.abs()).max(EPSILON);
            let relative = (actual - expected).abs() / scale;
            if relative > 0.01 * dt {
                violations += 1;
                tracing::warn!(
                    index = handle.index,
                    expected,
                    actual,
                    relative,
                    "kinetic energy law violated"
                );
            }
        }
        violations
    }

    fn proxies(&self) -> Result<Vec<Proxy>> {
        self.bodies()
            .map(|(handle, body)| -> Result<Proxy> {
                Ok(Proxy {
                    handle,
                    aabb: body.world_aabb(self.shape(body.shape())?),
                    is_static: body.is_static(),
                })
            })
            .collect()
    }

    fn resolve_pair<N>(
        &mut self,
        handle_a: BodyHandle,
        handle_b: BodyHandle,
        narrow_phase: &N,
        report: &mut StepReport,
    ) -> Result<()>
    where
        N: NarrowPhase + ?Sized,
    {
        if handle_a == handle_b {
            return Ok(());
        }
        let a = self.body(handle_a)?;
        let b = self.body(handle_b)?;
        if a.is_static() && b.is_static() {
            return Ok(());
        }
        let shape_a = self.shape(a.shape())?;
        let shape_b = self.shape(b.shape())?;
        let Some(hit) = narrow_phase.collide(shape_a, &a.shape_pose(), shape_b, &b.shape_pose())
        else {
            return Ok(());
        };
        report.contacts += 1;

        if shape_a.flags.contains(ShapeFlags::SENSOR) || shape_b.flags.contains(ShapeFlags::SENSOR)
        {
            report.sensor_contacts += 1;
            return Ok(());
        }

        let offset = a.shape_offset();
        let geometry = ContactPoint {
            point: offset.transform_point(hit.point),
            axis: offset.transform_vector(hit.axis),
            depth: hit.depth,
        };
        let material = Material::combine(
            self.materials.try_get(a.material())?,
            self.materials.try_get(b.material())?,
        );
        let contact = Contact::new(a, b, geometry, material);
        if !contact.is_approaching() {
            report.separating_skipped += 1;
            return Ok(());
        }
        let pair = match restitution_impulse(&contact) {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(
                    a = handle_a.index,
                    b = handle_b.index,
                    %err,
                    "skipping unresolvable contact"
                );
                return Ok(());
            }
        };

        self.body_mut(handle_a)?.apply_local_impulse(pair.on_a);
        self.body_mut(handle_b)?.apply_local_impulse(pair.on_b);
        report.impulses_applied += 1;
        Ok(())
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

/// ECS system that advances the world by the configured fixed timestep.
///
/// Intended for a fixed-rate schedule. Step failures are logged and the
/// schedule keeps running.
pub fn physics_step_system<N>(mut physics: ResMut<PhysicsWorld>, narrow_phase: Res<N>)
where
    N: NarrowPhase + Resource,
{
    let dt = physics.config().fixed_timestep;
    if let Err(err) = physics.step(dt, &*narrow_phase) {
        tracing::error!(%err, "physics step failed");
    }
}

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
