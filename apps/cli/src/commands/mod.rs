//! Command implementations for the tmining CLI.

pub mod models;
pub mod predict;
pub mod reconcile;
pub mod train;
pub mod types;
pub mod users;
pub mod validate;

use anyhow::{bail, Result};
use colored::Colorize;
use tmining_core::ModelRecord;

use crate::commands::types::ModelSelection;

/// Where a command reads its artifact from.
pub enum Selected<'a> {
    Registered { user: &'a str, model: &'a str },
    File(&'a std::path::Path),
}

impl ModelSelection {
    pub fn resolve(&self) -> Result<Selected<'_>> {
        match (&self.model, &self.user, &self.artifact) {
            (Some(model), Some(user), None) => Ok(Selected::Registered { user, model }),
            (None, _, Some(path)) => Ok(Selected::File(path)),
            _ => bail!("Select a model with --model and --user, or an artifact file with --artifact"),
        }
    }
}

pub(crate) fn print_model_line(model: &ModelRecord) {
    let visibility = if model.shared { "shared".green() } else { "private".dimmed() };
    println!("{:<38} {:<24} {:<8} {}", model.identifier.cyan(), model.name, visibility, model.owner_identifier.dimmed());
}

pub(crate) fn print_model_header() {
    println!("{:<38} {:<24} {:<8} {}", "ID", "Name", "Access", "Owner");
    println!("{}", "─".repeat(90));
}

pub(crate) fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}
