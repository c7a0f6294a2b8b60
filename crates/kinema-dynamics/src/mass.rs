//! Mass, center of mass, and inertia tensors derived from shapes.

use std::f32::consts::PI;

use glam::{Mat3, Vec3};
use kinema_math::{EPSILON, InverseInertia, Pose, outer, try_inverse};
use kinema_shape::{Shape, ShapeFlags, ShapeKind};

/// Second moment of the canonical tetrahedron `(0, e₁, e₂, e₃)` at unit
/// density: `∫ x xᵀ dV`.
const CANONICAL_TET_COVARIANCE: Mat3 = Mat3::from_cols_array(&[
    2.0 / 120.0,
    1.0 / 120.0,
    1.0 / 120.0,
    1.0 / 120.0,
    2.0 / 120.0,
    1.0 / 120.0,
    1.0 / 120.0,
    1.0 / 120.0,
    2.0 / 120.0,
]);

/// Mass distribution of a rigid shape.
///
/// `inertia` is taken about `center_of_mass` with axes parallel to the frame
/// the properties are expressed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassProperties {
    pub inertia: Mat3,
    pub center_of_mass: Vec3,
    pub mass: f32,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::ZERO
    }
}

impl MassProperties {
    /// No mass at all.
    pub const ZERO: Self = Self {
        inertia: Mat3::ZERO,
        center_of_mass: Vec3::ZERO,
        mass: 0.0,
    };

    pub const fn new(mass: f32, center_of_mass: Vec3, inertia: Mat3) -> Self {
        Self {
            inertia,
            center_of_mass,
            mass,
        }
    }

    /// Solid sphere of the given mass centred at the origin.
    pub fn solid_sphere(mass: f32, radius: f32) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self::new(mass, Vec3::ZERO, Mat3::from_diagonal(Vec3::splat(i)))
    }

    /// Computes the mass properties of `shape` at uniform `density`,
    /// expressed in the shape's parent frame (its `local` pose applied).
    ///
    /// Triangles, terrain, and shapes flagged [`ShapeFlags::NO_MASS`]
    /// contribute nothing. Compound shapes sum their children.
    pub fn from_shape(shape: &Shape, density: f32) -> Self {
        if shape.flags.contains(ShapeFlags::NO_MASS) || density.is_nan() || density <= 0.0 {
            return Self::ZERO;
        }
        let own = match &shape.kind {
            ShapeKind::Sphere { radius } => {
                let r = *radius;
                Self::solid_sphere(density * 4.0 / 3.0 * PI * r * r * r, r)
            }
            ShapeKind::Box { half_extents } => cuboid(*half_extents, density),
            ShapeKind::Cylinder {
                radius,
                half_height,
            } => cylinder(*radius, *half_height, density),
            ShapeKind::Capsule {
                radius,
                half_height,
            } => capsule(*radius, *half_height, density),
            ShapeKind::Polytope { vertices, faces } => polytope(vertices, faces, density),
            ShapeKind::Array(children) => Self::sum(children, density),
            ShapeKind::Bvh(bvh) => Self::sum(bvh.children(), density),
            ShapeKind::Triangle { .. } | ShapeKind::Terrain(_) => Self::ZERO,
        };
        own.transformed(&shape.local)
    }

    fn sum(children: &[Shape], density: f32) -> Self {
        children
            .iter()
            .map(|child| Self::from_shape(child, density))
            .fold(Self::ZERO, |acc, m| acc.combine(&m))
    }

    /// Re-expresses the properties in the parent frame of `pose`.
    pub fn transformed(&self, pose: &Pose) -> Self {
        let r = pose.rotation;
        Self {
            inertia: r * self.inertia * r.transpose(),
            center_of_mass: pose.transform_point(self.center_of_mass),
            mass: self.mass,
        }
    }

    /// Merges two distributions expressed in the same frame, moving both
    /// tensors to the combined center of mass (parallel-axis theorem).
    pub fn combine(&self, other: &Self) -> Self {
        let mass = self.mass + other.mass;
        if mass <= EPSILON {
            return Self::ZERO;
        }
        let com = (self.center_of_mass * self.mass + other.center_of_mass * other.mass) / mass;
        let inertia = self.shifted_inertia(com) + other.shifted_inertia(com);
        Self::new(mass, com, inertia)
    }

    /// Inertia about `point` (parallel-axis theorem).
    pub fn shifted_inertia(&self, point: Vec3) -> Mat3 {
        let d = self.center_of_mass - point;
        self.inertia + (Mat3::from_diagonal(Vec3::splat(d.length_squared())) - outer(d, d)) * self.mass
    }

    /// Spatial inverse inertia about the center of mass. Zero mass or a
    /// singular tensor yields a zero block rather than infinities.
    pub fn inverse_inertia(&self) -> InverseInertia {
        if !self.mass.is_finite() || self.mass <= EPSILON {
            return InverseInertia::ZERO;
        }
        InverseInertia::new(1.0 / self.mass, try_inverse(self.inertia).unwrap_or(Mat3::ZERO))
    }

    pub fn is_finite(&self) -> bool {
        self.mass.is_finite() && self.center_of_mass.is_finite() && self.inertia.is_finite()
    }
}

fn cuboid(h: Vec3, density: f32) -> MassProperties {
    let mass = 8.0 * h.x * h.y * h.z * density;
    let sq = h * h;
    let diag = Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 3.0);
    MassProperties::new(mass, Vec3::ZERO, Mat3::from_diagonal(diag))
}

fn cylinder(r: f32, half_height: f32, density: f32) -> MassProperties {
    let height = 2.0 * half_height;
    let mass = PI * r * r * height * density;
    let axial = 0.5 * mass * r * r;
    let lateral = mass * (3.0 * r * r + height * height) / 12.0;
    MassProperties::new(
        mass,
        Vec3::ZERO,
        Mat3::from_diagonal(Vec3::new(lateral, lateral, axial)),
    )
}

/// Cylinder of height `2h` capped by two hemispheres of radius `r`.
fn capsule(r: f32, h: f32, density: f32) -> MassProperties {
    let r2 = r * r;
    let m_cyl = PI * r2 * 2.0 * h * density;
    let m_caps = 4.0 / 3.0 * PI * r2 * r * density;
    let axial = m_cyl * r2 / 2.0 + m_caps * 2.0 * r2 / 5.0;
    let lateral =
        m_cyl * (h * h / 3.0 + r2 / 4.0) + m_caps * (2.0 * r2 / 5.0 + h * h + 3.0 * h * r / 4.0);
    MassProperties::new(
        m_cyl + m_caps,
        Vec3::ZERO,
        Mat3::from_diagonal(Vec3::new(lateral, lateral, axial)),
    )
}

/// Integrates a closed triangle mesh by summing signed tetrahedra fanned
/// from the origin.
fn polytope(vertices: &[Vec3], faces: &[[u32; 3]], density: f32) -> MassProperties {
    let mut volume = 0.0;
    let mut first_moment = Vec3::ZERO;
    let mut covariance = Mat3::ZERO;

    for face in faces {
        let [Some(&a), Some(&b), Some(&c)] = face.map(|i| vertices.get(i as usize)) else {
            continue;
        };
        let det = a.dot(b.cross(c));
        let tet_volume = det / 6.0;
        volume += tet_volume;
        first_moment += (a + b + c) * (tet_volume / 4.0);
        let basis = Mat3::from_cols(a, b, c);
        covariance += basis * CANONICAL_TET_COVARIANCE * basis.transpose() * det;
    }

    // Inward winding gives a negative volume with the same magnitude.
    if volume < 0.0 {
        volume = -volume;
        first_moment = -first_moment;
        covariance = -covariance;
    }
    if volume <= EPSILON * EPSILON {
        return MassProperties::ZERO;
    }

    let mass = volume * density;
    let com = first_moment / volume;
    let covariance = covariance * density - outer(com, com) * mass;
    let trace = covariance.x_axis.x + covariance.y_axis.y + covariance.z_axis.z;
    let inertia = Mat3::from_diagonal(Vec3::splat(trace)) - covariance;
    MassProperties::new(mass, com, inertia)
}

#[cfg(test)]
#[path = "mass_tests.rs"]
mod tests;
