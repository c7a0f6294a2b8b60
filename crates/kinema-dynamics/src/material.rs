//! Surface response parameters and the registry that hands out [`MaterialId`]s.

use kinema_config::SimulationConfig;

use crate::contact::MAX_FRICTION;
use crate::error::{PhysicsError, Result};

/// Compact material identifier. `MaterialId(0)` is always the default material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MaterialId(pub u16);

impl MaterialId {
    pub const DEFAULT: Self = Self(0);
}

/// Contact response and bulk density of a body's surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Static friction coefficient in `[0, 1)`. It is mapped onto a cone
    /// slope by [`friction_cone_slope`](crate::friction_cone_slope).
    pub static_friction: f32,
    /// Fraction of the approach speed returned along the contact normal.
    pub elasticity_normal: f32,
    pub elasticity_tangential: f32,
    pub elasticity_torsional: f32,
    /// Mass per unit volume, in kg/m³.
    pub density: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            static_friction: 0.5,
            elasticity_normal: 0.5,
            elasticity_tangential: 0.0,
            elasticity_torsional: 0.0,
            density: 1000.0,
        }
    }
}

impl Material {
    /// Frictionless material that returns all normal velocity.
    pub fn perfectly_elastic(density: f32) -> Self {
        Self {
            static_friction: 0.0,
            elasticity_normal: 1.0,
            elasticity_tangential: 0.0,
            elasticity_torsional: 0.0,
            density,
        }
    }

    /// Default material built from the configured density, friction, and
    /// normal elasticity.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            static_friction: config.default_friction,
            elasticity_normal: config.default_elasticity,
            density: config.default_density,
            ..Self::default()
        }
    }

    /// Clamps every coefficient into its legal range.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] if any field is NaN or
    /// infinite.
    pub fn validated(mut self) -> Result<Self> {
        let fields = [
            self.static_friction,
            self.elasticity_normal,
            self.elasticity_tangential,
            self.elasticity_torsional,
            self.density,
        ];
        if fields.iter().any(|f| !f.is_finite()) {
            return Err(PhysicsError::invalid("material has non-finite coefficients"));
        }

        self.static_friction = self.static_friction.clamp(0.0, MAX_FRICTION);
        self.elasticity_normal = self.elasticity_normal.clamp(0.0, 1.0);
        self.elasticity_tangential = self.elasticity_tangential.clamp(0.0, 1.0);
        self.elasticity_torsional = self.elasticity_torsional.clamp(0.0, 1.0);
        self.density = self.density.max(0.0);
        Ok(self)
    }

    /// Material used for a contact between surfaces `a` and `b`: geometric
    /// mean of the frictions, arithmetic mean of the elasticities, and the
    /// density of `a`.
    pub fn combine(a: &Material, b: &Material) -> Material {
        Material {
            static_friction: (a.static_friction * b.static_friction).sqrt(),
            elasticity_normal: 0.5 * (a.elasticity_normal + b.elasticity_normal),
            elasticity_tangential: 0.5 * (a.elasticity_tangential + b.elasticity_tangential),
            elasticity_torsional: 0.5 * (a.elasticity_torsional + b.elasticity_torsional),
            density: a.density,
        }
    }
}

/// Dense `MaterialId → Material` table. The default material occupies id 0
/// so a zeroed id is always valid.
#[derive(Clone, Debug)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
}

impl MaterialRegistry {
    /// Creates a registry whose id 0 is `default`.
    pub fn new(default: Material) -> Self {
        Self {
            materials: vec![default],
        }
    }

    /// Validates and stores a material, returning its id.
    ///
    /// # Errors
    ///
    /// [`PhysicsError::InvalidArgument`] for non-finite coefficients and
    /// [`PhysicsError::RegistryFull`] once every `u16` id is taken.
    pub fn register(&mut self, material: Material) -> Result<MaterialId> {
        let material = material.validated()?;
        if self.materials.len() > u16::MAX as usize {
            return Err(PhysicsError::RegistryFull);
        }
        let id = MaterialId(self.materials.len() as u16);
        tracing::debug!(id = id.0, ?material, "material registered");
        self.materials.push(material);
        Ok(id)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    /// Looks up `id`, failing with [`PhysicsError::UnknownMaterial`].
    pub fn try_get(&self, id: MaterialId) -> Result<&Material> {
        self.get(id).ok_or(PhysicsError::UnknownMaterial(id))
    }

    pub fn default_material(&self) -> &Material {
        &self.materials[0]
    }

    /// Number of registered materials, the default included.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Returns `true` if only the default material is registered.
    pub fn is_empty(&self) -> bool {
        self.materials.len() <= 1
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new(Material::default())
    }
}
