//! tmining CLI - train, validate and share text-classification models
//!
//! Every command works against the registry and artifact directory named by
//! the layered configuration (`~/.tmining/config.toml`, `./.tminingrc`,
//! `TMINING_*` variables), which the global flags below override.

mod commands;
mod context;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use commands::types::{ModelsCommand, PredictArgs, TrainArgs, UsersCommand, ValidateArgs};
use context::CliContext;
use tmining_core::CoreConfig;

#[derive(Parser, Debug)]
#[command(
    name = "tmining",
    author,
    version,
    about = "Multi-user text-mining model registry and trainer"
)]
struct Args {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file (replaces ~/.tmining/config.toml and ./.tminingrc)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry database file, or `:memory:`
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory holding model artifacts
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model, optionally registering it for a user
    Train(TrainArgs),

    /// Score a model on a labeled dataset
    Validate(ValidateArgs),

    /// Predict the label of a text
    Predict(PredictArgs),

    /// Manage registered models
    #[command(subcommand)]
    Models(ModelsCommand),

    /// Manage users
    #[command(subcommand)]
    Users(UsersCommand),

    /// Find artifacts with no registry entry
    Reconcile {
        /// Delete the orphaned artifacts
        #[arg(long)]
        delete: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Train(_) => "train",
            Self::Validate(_) => "validate",
            Self::Predict(_) => "predict",
            Self::Models(_) => "models",
            Self::Users(_) => "users",
            Self::Reconcile { .. } => "reconcile",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = CoreConfig::discover_and_load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = args.database {
        config.database.path = Some(path);
    }
    if let Some(dir) = args.model_dir {
        config.artifacts.model_dir = Some(dir);
    }
    if args.log_level.is_some() {
        config.log_level = args.log_level;
    }

    logging::init(config.log_level.as_deref().unwrap_or("info"), args.json)?;

    debug!(command = args.command.name(), json = args.json, "Dispatching command");
    let ctx = CliContext::new(config, args.json);
    match args.command {
        Command::Train(args) => commands::train::execute(&ctx, args),
        Command::Validate(args) => commands::validate::execute(&ctx, args),
        Command::Predict(args) => commands::predict::execute(&ctx, args),
        Command::Models(command) => commands::models::execute(&ctx, command),
        Command::Users(command) => commands::users::execute(&ctx, command),
        Command::Reconcile { delete } => commands::reconcile::execute(&ctx, delete),
    }
}
