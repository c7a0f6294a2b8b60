//! Configuration for the Kinema physics kernel.
//!
//! Settings persist to disk as RON files, accept CLI overrides via clap, and
//! deserialize with per-field defaults so older and newer files both load.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, SimulationConfig, default_config_dir};
pub use error::ConfigError;
