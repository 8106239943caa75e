//! Argument types for the subcommands.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Dataset columns shared by `train` and `validate`.
#[derive(Args, Debug, Clone)]
pub struct ColumnArgs {
    /// Column holding the input text
    #[arg(short = 'x', long = "x-column", default_value = "text")]
    pub x: String,

    /// Column holding the integer label
    #[arg(short = 'y', long = "y-column", default_value = "target")]
    pub y: String,
}

/// Which artifact to load: a registered model or a file.
#[derive(Args, Debug, Clone)]
pub struct ModelSelection {
    /// Registered model identifier (or one of your model names)
    #[arg(short, long, requires = "user", conflicts_with = "artifact")]
    pub model: Option<String>,

    /// Identifier of the user reading the model
    #[arg(short, long)]
    pub user: Option<String>,

    /// Artifact file to load instead of a registered model
    #[arg(long)]
    pub artifact: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV dataset to train on
    #[arg(short, long)]
    pub dataset: PathBuf,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// Number of shuffle splits to evaluate
    #[arg(short, long, default_value_t = 1)]
    pub kfold: usize,

    /// Held-out fraction per split; 0 trains once on every row
    #[arg(short, long, default_value_t = 0.0)]
    pub test_size: f64,

    /// Learning algorithm (perceptron, naive_bayes, ridge; svc, svr)
    #[arg(long, default_value = "perceptron")]
    pub algorithm: String,

    /// Text vectorizer (tfidf, count)
    #[arg(long, default_value = "tfidf")]
    pub vectorizer: String,

    /// Register the model for this user identifier
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Display name of the registered model
    #[arg(short, long, requires = "owner")]
    pub name: Option<String>,

    /// Make the registered model readable by every user
    #[arg(long, requires = "owner")]
    pub shared: bool,

    /// Write the artifact here instead of registering it
    #[arg(long, conflicts_with = "owner")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// CSV dataset to score on
    #[arg(short, long)]
    pub dataset: PathBuf,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// Held-out fraction; 1 scores every row
    #[arg(short, long, default_value_t = 0.2)]
    pub size: f64,

    #[command(flatten)]
    pub selection: ModelSelection,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Text to classify
    #[arg(long)]
    pub text: String,

    #[command(flatten)]
    pub selection: ModelSelection,
}

/// Model management subcommands.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List a user's models
    List {
        /// User identifier
        #[arg(short, long)]
        user: String,

        /// Also list every shared model
        #[arg(long)]
        include_shared: bool,
    },

    /// Rename or (un)share a model
    Edit {
        #[arg(short, long)]
        user: String,

        /// Model identifier
        #[arg(short, long)]
        model: String,

        /// New display name
        #[arg(short, long)]
        name: Option<String>,

        /// New sharing flag
        #[arg(long)]
        shared: Option<bool>,
    },

    /// Delete a model and its artifact
    Remove {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        model: String,
    },

    /// Register an artifact file
    Upload {
        #[arg(short, long)]
        user: String,

        /// Artifact file
        #[arg(short, long)]
        file: PathBuf,

        /// Display name
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        shared: bool,
    },

    /// Copy a readable model's artifact to a file
    Download {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        model: String,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// User management subcommands.
#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// Register a user from identity-provider claims
    Add {
        /// Subject (`sub` claim); merged into --claims
        #[arg(short, long)]
        subject: String,

        /// User identifier; generated when omitted
        #[arg(short, long)]
        identifier: Option<String>,

        /// Stored credential
        #[arg(long)]
        credential: Option<String>,

        /// Additional claims as a JSON object
        #[arg(long)]
        claims: Option<String>,
    },

    /// Show a user and its models
    Show {
        /// Look up by subject
        #[arg(short, long, conflicts_with = "identifier", required_unless_present = "identifier")]
        subject: Option<String>,

        /// Look up by identifier
        #[arg(short, long)]
        identifier: Option<String>,
    },

    /// Delete a user, its models and their artifacts
    Remove {
        #[arg(short, long)]
        identifier: String,
    },
}
