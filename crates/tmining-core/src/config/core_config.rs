//! Layered TOML configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the global file
//! (`~/.tmining/config.toml`), the local file (`./.tminingrc`), then
//! `TMINING_*` environment variables. Command-line flags are applied on top
//! by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tmining_training::{ArtifactLayout, DEFAULT_SEED};

use crate::storage::{DatabaseLocation, PoolSettings};

/// Database path that selects a private in-memory database.
pub const MEMORY_DATABASE: &str = ":memory:";

const DEFAULT_MAX_CONNECTIONS: usize = 4;
const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub artifacts: ArtifactConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    /// Log level or `tracing` filter directive
    #[serde(default)]
    pub log_level: Option<String>,
}

/// `[database]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub max_connections: Option<usize>,

    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,

    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
}

/// `[artifacts]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding `<model id>.mdl` blobs
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
}

/// `[training]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed for shuffle splits
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read or write a configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl CoreConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".tmining")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".tminingrc")
    }

    /// Load the global then the local file, later files overriding earlier
    /// ones. Missing files are skipped; unreadable or malformed ones are errors.
    pub fn load_layered(paths: &[&Path]) -> ConfigResult<Self> {
        let mut config = Self::default();
        for path in paths {
            match Self::load_from_file(path) {
                Ok(layer) => config.merge(&layer),
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(config)
    }

    /// Discover and load configuration files plus environment overrides.
    ///
    /// An explicit `path` replaces the global/local discovery and must exist.
    pub fn discover_and_load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_layered(&[Self::default_global_path().as_path(), Self::default_local_path().as_path()])?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        fn take<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
            if other.is_some() {
                slot.clone_from(other);
            }
        }

        take(&mut self.database.path, &other.database.path);
        take(&mut self.database.max_connections, &other.database.max_connections);
        take(&mut self.database.acquire_timeout_ms, &other.database.acquire_timeout_ms);
        take(&mut self.database.busy_timeout_ms, &other.database.busy_timeout_ms);
        take(&mut self.artifacts.model_dir, &other.artifacts.model_dir);
        take(&mut self.training.seed, &other.training.seed);
        take(&mut self.log_level, &other.log_level);
    }

    /// Apply `TMINING_DATABASE`, `TMINING_MODEL_DIR`, `TMINING_MAX_CONNECTIONS`,
    /// `TMINING_SEED` and `TMINING_LOG_LEVEL` as looked up by `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(path) = lookup("TMINING_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("TMINING_MODEL_DIR") {
            self.artifacts.model_dir = Some(PathBuf::from(dir));
        }
        if let Some(max) = lookup("TMINING_MAX_CONNECTIONS") {
            let max = max
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("TMINING_MAX_CONNECTIONS={max}")))?;
            self.database.max_connections = Some(max);
        }
        if let Some(seed) = lookup("TMINING_SEED") {
            let seed = seed.parse().map_err(|_| ConfigError::InvalidValue(format!("TMINING_SEED={seed}")))?;
            self.training.seed = Some(seed);
        }
        if let Some(level) = lookup("TMINING_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == Some(0) {
            return Err(ConfigError::InvalidValue("database.max_connections must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| PathBuf::from(".tmining").join("registry.db"))
    }

    pub fn model_dir(&self) -> PathBuf {
        self.artifacts.model_dir.clone().unwrap_or_else(|| PathBuf::from(".tmining").join("models"))
    }

    pub fn seed(&self) -> u64 {
        self.training.seed.unwrap_or(DEFAULT_SEED)
    }

    pub fn database_location(&self) -> DatabaseLocation {
        let path = self.database_path();
        if path.as_os_str() == MEMORY_DATABASE {
            DatabaseLocation::unique_memory()
        } else {
            DatabaseLocation::File(path)
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings::new(self.database_location())
            .with_max_connections(self.database.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .with_acquire_timeout(Duration::from_millis(
                self.database.acquire_timeout_ms.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_MS),
            ))
            .with_busy_timeout(Duration::from_millis(self.database.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)))
    }

    pub fn artifact_layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(self.model_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config_content = r#"
log_level = "debug"

[database]
path = "/var/lib/tmining/registry.db"
max_connections = 8
acquire_timeout_ms = 250

[artifacts]
model_dir = "/var/lib/tmining/models"

[training]
seed = 42
"#;

        std::fs::write(&config_path, config_content).unwrap();

        let config = CoreConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/tmining/registry.db"));
        assert_eq!(config.model_dir(), PathBuf::from("/var/lib/tmining/models"));
        assert_eq!(config.seed(), 42);
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        let settings = config.pool_settings();
        assert_eq!(settings.max_connections, 8);
        assert_eq!(settings.acquire_timeout, Duration::from_millis(250));
        assert_eq!(settings.busy_timeout, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS));
    }

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.database_path(), PathBuf::from(".tmining/registry.db"));
        assert_eq!(config.seed(), DEFAULT_SEED);
        assert_eq!(config.pool_settings().max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let local = temp_dir.path().join("local.toml");
        std::fs::write(&global, "log_level = \"info\"\n[training]\nseed = 1\n").unwrap();
        std::fs::write(&local, "[training]\nseed = 2\n").unwrap();

        let config = CoreConfig::load_layered(&[global.as_path(), local.as_path()]).unwrap();
        assert_eq!(config.seed(), 2);
        assert_eq!(config.log_level.as_deref(), Some("info"));
    }

    #[test]
    fn test_missing_layers_are_skipped_but_bad_ones_fail() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert_eq!(CoreConfig::load_layered(&[missing.as_path()]).unwrap(), CoreConfig::default());

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[database\n").unwrap();
        assert!(matches!(CoreConfig::load_layered(&[broken.as_path()]), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [("TMINING_DATABASE", ":memory:"), ("TMINING_SEED", "7"), ("TMINING_LOG_LEVEL", "warn")]
                .into_iter()
                .collect();
        let mut config = CoreConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| (*v).to_string())).unwrap();

        assert_eq!(config.seed(), 7);
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(matches!(config.database_location(), DatabaseLocation::Memory { .. }));

        let err = config.apply_env_overrides(|key| (key == "TMINING_SEED").then(|| "seven".to_string()));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_zero_connections_invalid() {
        let mut config = CoreConfig::default();
        config.database.max_connections = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = CoreConfig::default();
        config.training.seed = Some(9);
        config.save_to_file(&path).unwrap();
        assert_eq!(CoreConfig::load_from_file(&path).unwrap(), config);
    }
}
