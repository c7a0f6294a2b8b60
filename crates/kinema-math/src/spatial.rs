//! 6D spatial vectors and the block-diagonal spatial inverse inertia.
//!
//! Convention: `[linear; angular]`. A spatial momentum is `[p; L]` with `L`
//! about the center of mass, a spatial velocity is `[v; ω]`, a spatial force is
//! `[f; τ]`.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use glam::{Mat3, Vec3};

/// 6D spatial vector: momentum, velocity, force, or impulse.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpatialVec {
    /// Linear part (momentum, velocity, force).
    pub linear: Vec3,
    /// Angular part (angular momentum, angular velocity, torque).
    pub angular: Vec3,
}

impl SpatialVec {
    /// Zero spatial vector.
    pub const ZERO: Self = Self {
        linear: Vec3::ZERO,
        angular: Vec3::ZERO,
    };

    /// Create from linear and angular parts.
    #[inline]
    pub const fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }

    /// Create from six components `[lx, ly, lz, ax, ay, az]`.
    #[inline]
    pub fn from_array(v: [f32; 6]) -> Self {
        Self {
            linear: Vec3::new(v[0], v[1], v[2]),
            angular: Vec3::new(v[3], v[4], v[5]),
        }
    }

    /// Returns the six components `[lx, ly, lz, ax, ay, az]`.
    #[inline]
    pub fn to_array(self) -> [f32; 6] {
        [
            self.linear.x,
            self.linear.y,
            self.linear.z,
            self.angular.x,
            self.angular.y,
            self.angular.z,
        ]
    }

    /// 6D inner product. For a velocity and a momentum this is twice the
    /// kinetic energy; for a velocity and a force it is the power.
    #[inline]
    pub fn dot(&self, other: &SpatialVec) -> f32 {
        self.linear.dot(other.linear) + self.angular.dot(other.angular)
    }

    /// Re-references a force-type vector (force, momentum, impulse) applied
    /// at `r` relative to the current reference point, so the angular part
    /// picks up the lever-arm moment `r × linear`.
    #[inline]
    pub fn shift(&self, r: Vec3) -> SpatialVec {
        SpatialVec {
            linear: self.linear,
            angular: self.angular + r.cross(self.linear),
        }
    }

    /// Rotates both parts by `rot`.
    #[inline]
    pub fn rotate(&self, rot: Mat3) -> SpatialVec {
        SpatialVec {
            linear: rot * self.linear,
            angular: rot * self.angular,
        }
    }

    /// Returns `true` if every component is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.linear.is_finite() && self.angular.is_finite()
    }

    /// Euclidean norm over all six components.
    #[inline]
    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Component-wise comparison within `max_abs_diff`.
    pub fn abs_diff_eq(&self, other: SpatialVec, max_abs_diff: f32) -> bool {
        self.linear.abs_diff_eq(other.linear, max_abs_diff)
            && self.angular.abs_diff_eq(other.angular, max_abs_diff)
    }
}

impl Add for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn add(self, rhs: SpatialVec) -> SpatialVec {
        SpatialVec::new(self.linear + rhs.linear, self.angular + rhs.angular)
    }
}

impl AddAssign for SpatialVec {
    #[inline]
    fn add_assign(&mut self, rhs: SpatialVec) {
        self.linear += rhs.linear;
        self.angular += rhs.angular;
    }
}

impl Sub for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn sub(self, rhs: SpatialVec) -> SpatialVec {
        SpatialVec::new(self.linear - rhs.linear, self.angular - rhs.angular)
    }
}

impl SubAssign for SpatialVec {
    #[inline]
    fn sub_assign(&mut self, rhs: SpatialVec) {
        self.linear -= rhs.linear;
        self.angular -= rhs.angular;
    }
}

impl Mul<f32> for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn mul(self, rhs: f32) -> SpatialVec {
        SpatialVec::new(self.linear * rhs, self.angular * rhs)
    }
}

impl Neg for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn neg(self) -> SpatialVec {
        SpatialVec::new(-self.linear, -self.angular)
    }
}

/// Spatial inverse inertia about the center of mass.
///
/// The 6x6 operator is block diagonal: `inv_mass · I₃` on the linear block and
/// the 3x3 inverse rotational inertia on the angular block. A zero operator
/// represents an immovable (infinite-mass) body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InverseInertia {
    /// Reciprocal of the mass (0 for infinite mass).
    pub inv_mass: f32,
    /// Inverse rotational inertia tensor.
    pub angular: Mat3,
}

impl Default for InverseInertia {
    fn default() -> Self {
        Self::ZERO
    }
}

impl InverseInertia {
    /// Infinite mass and inertia: every momentum maps to zero velocity.
    pub const ZERO: Self = Self {
        inv_mass: 0.0,
        angular: Mat3::ZERO,
    };

    /// Create from an inverse mass and inverse rotational inertia.
    pub const fn new(inv_mass: f32, angular: Mat3) -> Self {
        Self { inv_mass, angular }
    }

    /// Maps a momentum-type vector to the matching velocity.
    #[inline]
    pub fn apply(&self, momentum: &SpatialVec) -> SpatialVec {
        SpatialVec {
            linear: momentum.linear * self.inv_mass,
            angular: self.angular * momentum.angular,
        }
    }

    /// Expresses the tensor in a frame rotated by `rot`: `R · I⁻¹ · Rᵀ`.
    #[inline]
    pub fn rotated(&self, rot: Mat3) -> InverseInertia {
        InverseInertia {
            inv_mass: self.inv_mass,
            angular: rot * self.angular * rot.transpose(),
        }
    }

    /// Returns `true` if this operator carries no mass at all.
    pub fn is_zero(&self) -> bool {
        self.inv_mass == 0.0 && self.angular == Mat3::ZERO
    }

    /// Returns `true` if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.inv_mass.is_finite() && self.angular.is_finite()
    }
}
