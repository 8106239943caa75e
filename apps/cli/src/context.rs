//! State shared by every command.

use anyhow::{Context, Result};
use serde::Serialize;
use tmining_core::{CoreConfig, ModelService};
use tracing::debug;

pub struct CliContext {
    pub config: CoreConfig,
    pub json: bool,
}

impl CliContext {
    pub fn new(config: CoreConfig, json: bool) -> Self {
        Self { config, json }
    }

    /// Open the configured registry and artifact store.
    pub fn service(&self) -> Result<ModelService> {
        debug!(
            database = %self.config.database_path().display(),
            model_dir = %self.config.model_dir().display(),
            "Opening model service"
        );
        ModelService::from_config(&self.config).with_context(|| {
            format!(
                "Failed to open registry at {} with artifacts in {}",
                self.config.database_path().display(),
                self.config.model_dir().display()
            )
        })
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
