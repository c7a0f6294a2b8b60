//! Simulation settings with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "kinema.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Integration and material defaults.
    pub simulation: SimulationConfig,
    /// Diagnostics.
    pub debug: DebugConfig,
}

/// Parameters consumed by the physics world on every step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Uniform acceleration applied to every dynamic body, in m/s².
    pub gravity: [f32; 3],
    /// Step length used by the ECS step system, in seconds.
    pub fixed_timestep: f32,
    /// Midpoint inertia refinement passes per integration step.
    pub inertia_refinement_passes: u32,
    /// Density in kg/m³ for the built-in default material.
    pub default_density: f32,
    /// Friction coefficient for the built-in default material.
    pub default_friction: f32,
    /// Restitution coefficient for the built-in default material.
    pub default_elasticity: f32,
}

/// Diagnostics and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g. "debug", "info", "warn").
    pub log_level: String,
    /// Compare each body's kinetic energy change against the work done by
    /// applied forces and warn when they disagree.
    pub energy_checks: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, -9.81],
            fixed_timestep: 1.0 / 60.0,
            inertia_refinement_passes: 1,
            default_density: 1000.0,
            default_friction: 0.5,
            default_elasticity: 0.5,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            energy_checks: false,
        }
    }
}

impl SimulationConfig {
    /// Checks that every value is usable by the integrator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(invalid("gravity", "components must be finite"));
        }
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(invalid(
                "fixed_timestep",
                format!("must be positive, got {}", self.fixed_timestep),
            ));
        }
        if !(self.default_density.is_finite() && self.default_density >= 0.0) {
            return Err(invalid("default_density", "must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.default_friction) {
            return Err(invalid("default_friction", "must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.default_elasticity) {
            return Err(invalid("default_elasticity", "must lie in [0, 1]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Platform config directory for Kinema, e.g. `~/.config/kinema` on Linux.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kinema"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Loads `kinema.ron` from `config_dir`, writing a default file first if
    /// none exists. The loaded values are validated.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Writes the config to `config_dir/kinema.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)
    }

    /// Re-reads the file and returns `Some` only if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        config.simulation.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.simulation.gravity, [0.0, 0.0, -9.81]);
        assert_eq!(config.simulation.inertia_refinement_passes, 1);
        assert_eq!(config.debug.log_level, "info");
        assert!(!config.debug.energy_checks);
        assert!(config.simulation.validate().is_ok());
    }

    #[test]
    fn test_default_config_serializes() {
        let ron_str = ron::ser::to_string_pretty(
            &Config::default(),
            ron::ser::PrettyConfig::new().depth_limit(3),
        )
        .unwrap();
        assert!(ron_str.contains("inertia_refinement_passes: 1"));
        assert!(ron_str.contains("log_level: \"info\""));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = ron::from_str("(simulation: (fixed_timestep: 0.01))").unwrap();
        assert_eq!(config.simulation.fixed_timestep, 0.01);
        assert_eq!(config.simulation.default_density, 1000.0);
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(solver_iterations: 8)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut sim = SimulationConfig {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            sim.validate(),
            Err(ConfigError::Invalid {
                field: "fixed_timestep",
                ..
            })
        ));

        sim.fixed_timestep = 0.01;
        sim.default_friction = 1.5;
        assert!(matches!(
            sim.validate(),
            Err(ConfigError::Invalid {
                field: "default_friction",
                ..
            })
        ));

        sim.default_friction = 0.5;
        sim.gravity = [0.0, f32::NAN, 0.0];
        assert!(sim.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.simulation.gravity = [0.0, -1.62, 0.0];
        config.simulation.inertia_refinement_passes = 3;
        config.debug.energy_checks = true;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let config = Config::load_or_create(&nested).unwrap();
        assert_eq!(config, Config::default());
        assert!(nested.join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "(simulation: (fixed_timestep: -1.0))",
        )
        .unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.simulation.fixed_timestep = 0.005;
        modified.save(dir.path()).unwrap();

        let reloaded = config.reload(dir.path()).unwrap();
        assert_eq!(reloaded.unwrap().simulation.fixed_timestep, 0.005);
        assert!(modified.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_default_config_dir_is_namespaced() {
        if let Some(dir) = default_config_dir() {
            assert!(dir.ends_with("kinema"));
        }
    }
}
