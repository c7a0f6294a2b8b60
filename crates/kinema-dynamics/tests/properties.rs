//! Property-based tests for the integrator and the impulse resolver.
//!
//! Run with: cargo test -p kinema-dynamics --test properties

use glam::{Mat3, Vec3};
use kinema_dynamics::{
    Contact, ContactPoint, ImpulsePair, MassProperties, Material, MaterialId, RigidBody, evolve,
    friction_cone_slope, kinetic_energy_change, restitution_impulse,
};
use kinema_math::{Pose, SpatialVec};
use kinema_shape::ShapeId;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_vec3(range: f32) -> impl Strategy<Value = Vec3> {
    prop::array::uniform3(-range..range).prop_map(Vec3::from_array)
}

fn arb_unit() -> impl Strategy<Value = Vec3> {
    arb_vec3(1.0)
        .prop_filter("direction too short", |v| v.length() > 0.1)
        .prop_map(Vec3::normalize)
}

fn arb_rotation() -> impl Strategy<Value = Mat3> {
    (arb_unit(), -3.0..3.0f32).prop_map(|(axis, angle)| Mat3::from_axis_angle(axis, angle))
}

/// Diagonal inertia with distinct principal moments.
fn arb_mass() -> impl Strategy<Value = MassProperties> {
    (0.5..20.0f32, prop::array::uniform3(0.5..5.0f32)).prop_map(|(mass, moments)| {
        MassProperties::new(mass, Vec3::ZERO, Mat3::from_diagonal(Vec3::from_array(moments)))
    })
}

fn arb_body() -> impl Strategy<Value = RigidBody> {
    (arb_mass(), arb_rotation(), arb_vec3(3.0), arb_vec3(5.0), arb_vec3(2.0)).prop_map(
        |(mass, rotation, position, velocity, spin)| {
            let mut body = RigidBody::new_dynamic(
                ShapeId(0),
                MaterialId::DEFAULT,
                mass,
                Pose::new(rotation, position),
            );
            body.set_velocity(SpatialVec::new(velocity, spin));
            body
        },
    )
}

fn arb_geometry() -> impl Strategy<Value = ContactPoint> {
    (arb_vec3(1.0), arb_unit(), 0.0..0.1f32).prop_map(|(point, axis, depth)| ContactPoint {
        point,
        axis,
        depth,
    })
}

fn material(friction: f32, elasticity: f32) -> Material {
    Material {
        static_friction: friction,
        elasticity_normal: elasticity,
        ..Material::default()
    }
}

fn world_impulse(body: &RigidBody, local: SpatialVec) -> SpatialVec {
    local.rotate(body.pose().rotation).shift(body.position())
}

fn point_impulse(pair: &ImpulsePair) -> Vec3 {
    -pair.on_a.linear
}

// =============================================================================
// Resolver
// =============================================================================

proptest! {
    #[test]
    fn proptest_tangential_impulse_stays_in_cone(
        a in arb_body(),
        b in arb_body(),
        geometry in arb_geometry(),
        friction in 0.0..0.99f32,
        elasticity in 0.0..1.0f32,
    ) {
        let contact = Contact::new(&a, &b, geometry, material(friction, elasticity));
        prop_assume!(contact.is_approaching());

        let pair = restitution_impulse(&contact).unwrap();
        let j = point_impulse(&pair);
        let normal = geometry.axis * geometry.axis.dot(j);
        let tangential = j - normal;
        let limit = friction_cone_slope(friction) * normal.length();
        prop_assert!(
            tangential.length() <= limit * (1.0 + 1e-4) + 1e-4,
            "tangential {} exceeds cone limit {}",
            tangential.length(),
            limit
        );
    }

    #[test]
    fn proptest_impulse_pair_conserves_momentum(
        a in arb_body(),
        b in arb_body(),
        geometry in arb_geometry(),
        friction in 0.0..0.99f32,
        elasticity in 0.0..1.0f32,
    ) {
        let contact = Contact::new(&a, &b, geometry, material(friction, elasticity));
        prop_assume!(contact.is_approaching());

        let pair = restitution_impulse(&contact).unwrap();
        let total = world_impulse(&a, pair.on_a) + world_impulse(&b, pair.on_b);
        let scale = 1.0 + pair.on_a.length() + pair.on_b.length();
        prop_assert!(total.length() <= 1e-4 * scale, "net impulse {total:?}");
    }

    #[test]
    fn proptest_perfect_restitution_reverses_normal_velocity(
        a in arb_body(),
        b in arb_body(),
        geometry in arb_geometry(),
    ) {
        let contact = Contact::new(&a, &b, geometry, material(0.0, 1.0));
        prop_assume!(contact.is_approaching());
        let before = contact.normal_velocity();

        let pair = restitution_impulse(&contact).unwrap();
        let (mut a, mut b) = (a, b);
        a.apply_local_impulse(pair.on_a);
        b.apply_local_impulse(pair.on_b);
        let after = Contact::new(&a, &b, geometry, material(0.0, 1.0)).normal_velocity();
        prop_assert!(
            (after + before).abs() <= 1e-3 * (1.0 + before.abs()),
            "before={before} after={after}"
        );
    }

    #[test]
    fn proptest_separating_contact_rejected(
        a in arb_body(),
        b in arb_body(),
        geometry in arb_geometry(),
    ) {
        let contact = Contact::new(&a, &b, geometry, Material::default());
        prop_assume!(contact.normal_velocity() > 1e-3);
        prop_assert!(restitution_impulse(&contact).is_err());
    }
}

// =============================================================================
// Integrator
// =============================================================================

fn sphere_body(mass: f32, radius: f32, momentum: SpatialVec) -> RigidBody {
    let mut body = RigidBody::new_dynamic(
        ShapeId(0),
        MaterialId::DEFAULT,
        MassProperties::solid_sphere(mass, radius),
        Pose::IDENTITY,
    );
    body.set_momentum(momentum);
    body
}

proptest! {
    #[test]
    fn proptest_energy_change_law(
        body in arb_body(),
        force in prop::array::uniform6(-10.0..10.0f32),
        dt in 0.001..0.05f32,
    ) {
        let mut body = body;
        let force = SpatialVec::from_array(force);
        let predicted = body.kinetic_energy()
            + kinetic_energy_change(&force, &body.momentum(), body.inverse_inertia_world(), dt);

        body.apply_spatial_force(force);
        evolve(&mut body, dt).unwrap();
        let actual = body.kinetic_energy();
        let scale = predicted.abs().max(actual.abs()).max(1.0);
        prop_assert!(
            (actual - predicted).abs() <= 0.01 * dt * scale,
            "actual={actual} predicted={predicted} dt={dt}"
        );
    }

    #[test]
    fn proptest_free_body_conserves_momentum_and_energy(
        body in arb_body(),
        dt in 0.001..0.05f32,
        steps in 1usize..50,
    ) {
        let mut body = body;
        let momentum = body.momentum();
        let energy = body.kinetic_energy();
        for _ in 0..steps {
            evolve(&mut body, dt).unwrap();
        }
        prop_assert_eq!(body.momentum(), momentum);
        let drift = (body.kinetic_energy() - energy).abs();
        prop_assert!(drift <= 1e-3 * energy.max(1.0), "energy {energy} drifted by {drift}");
        let rotation = body.pose().rotation;
        prop_assert!((rotation * rotation.transpose()).abs_diff_eq(Mat3::IDENTITY, 1e-4));
    }

    #[test]
    fn proptest_rejects_non_positive_dt(body in arb_body(), dt in -1.0..=0.0f32) {
        let mut body = body;
        let before = body.clone();
        prop_assert!(evolve(&mut body, dt).is_err());
        prop_assert_eq!(body, before);
    }
}

// =============================================================================
// Reference scenario
// =============================================================================

#[test]
fn test_sphere_push_then_stop() {
    let mut body = sphere_body(5.0, 1.0, SpatialVec::ZERO);
    let force = SpatialVec::from_array([1.0, 1.0, 1.0, 1.0, 1.0, -1.0]);

    body.apply_spatial_force(force);
    evolve(&mut body, 1.0).unwrap();
    assert!(body.momentum().abs_diff_eq(force, 1e-6));

    body.apply_spatial_force(-body.momentum());
    evolve(&mut body, 1.0).unwrap();
    assert!(body.kinetic_energy().abs() < 1e-6);
}
