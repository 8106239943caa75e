//! Configuration for tmining.

pub mod core_config;

pub use core_config::{ArtifactConfig, ConfigError, ConfigResult, CoreConfig, DatabaseConfig, TrainingConfig};
