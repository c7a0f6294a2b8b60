//! Command-line overrides.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments for Kinema hosts. Values given here override
/// whatever was loaded from `kinema.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "kinema", about = "Kinema rigid-body simulation")]
pub struct CliArgs {
    /// Fixed step length in seconds.
    #[arg(long)]
    pub timestep: Option<f32>,

    /// Gravity as three comma-separated components, e.g. `0,0,-9.81`.
    #[arg(long, value_delimiter = ',')]
    pub gravity: Option<Vec<f32>>,

    /// Midpoint inertia refinement passes.
    #[arg(long)]
    pub refinement_passes: Option<u32>,

    /// Enable per-body energy checks.
    #[arg(long)]
    pub energy_checks: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Config directory (overrides the platform default).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Applies every override present in `args`.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(dt) = args.timestep {
            self.simulation.fixed_timestep = dt;
        }
        if let Some([x, y, z]) = args.gravity.as_deref() {
            self.simulation.gravity = [*x, *y, *z];
        }
        if let Some(passes) = args.refinement_passes {
            self.simulation.inertia_refinement_passes = passes;
        }
        if let Some(checks) = args.energy_checks {
            self.debug.energy_checks = checks;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            timestep: Some(0.002),
            gravity: Some(vec![0.0, -9.81, 0.0]),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.simulation.fixed_timestep, 0.002);
        assert_eq!(config.simulation.gravity, [0.0, -9.81, 0.0]);
        assert_eq!(config.debug.log_level, "trace");
        // Non-overridden fields retain defaults
        assert_eq!(config.simulation.inertia_refinement_passes, 1);
        assert!(!config.debug.energy_checks);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_from_args() {
        let args = CliArgs::parse_from([
            "kinema",
            "--gravity",
            "0,0,-1.62",
            "--refinement-passes",
            "4",
            "--energy-checks",
            "true",
        ]);
        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config.simulation.gravity, [0.0, 0.0, -1.62]);
        assert_eq!(config.simulation.inertia_refinement_passes, 4);
        assert!(config.debug.energy_checks);
    }
}
