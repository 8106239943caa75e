//! `tmining train`

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;
use tmining_training::{
    train_model, Algorithm, DatasetSource, ProgressSink, StdoutProgressSink, TracingProgressSink, TrainingJobSpec,
    VectorizerKind,
};

use crate::commands::format_metric;
use crate::commands::types::TrainArgs;
use crate::context::CliContext;

const DEFAULT_OUTPUT: &str = "model.mdl";

pub fn execute(ctx: &CliContext, args: TrainArgs) -> Result<()> {
    let algorithm: Algorithm = args.algorithm.parse()?;
    let vectorizer: VectorizerKind = args.vectorizer.parse()?;
    let job = TrainingJobSpec::new(DatasetSource::path(&args.dataset))
        .with_columns(args.columns.x, args.columns.y)
        .with_validation(args.kfold, args.test_size)
        .with_capabilities(algorithm, vectorizer)
        .with_seed(ctx.config.seed());

    let progress: &dyn ProgressSink = if ctx.json { &TracingProgressSink } else { &StdoutProgressSink };

    if let Some(owner) = args.owner.as_deref() {
        let service = ctx.service()?;
        let registered = service
            .train_and_register(owner, &job, args.name.as_deref(), args.shared, progress)
            .context("Training failed")?;

        if ctx.json {
            return ctx.print_json(&registered);
        }
        println!();
        println!("{} {}", "Registered model".bold().green(), registered.model.identifier.cyan());
        println!("  name:     {}", registered.model.name);
        println!("  shared:   {}", registered.model.shared);
        println!("  accuracy: {}", format_metric(registered.accuracy));
        println!("  f1:       {}", format_metric(registered.f1));
        return Ok(());
    }

    let output = args.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let outcome = train_model(&job, progress).context("Training failed")?;
    outcome.artifact.write(&output).with_context(|| format!("Failed to write {}", output.display()))?;

    if ctx.json {
        return ctx.print_json(&json!({
            "artifact": output,
            "job_id": outcome.artifact.manifest.job_id,
            "accuracy": outcome.accuracy,
            "f1": outcome.f1,
            "selected_split": outcome.selected_split,
        }));
    }
    println!();
    println!("{} {}", "Saved artifact".bold().green(), output.display().to_string().cyan());
    println!("  accuracy: {}", format_metric(outcome.accuracy));
    println!("  f1:       {}", format_metric(outcome.f1));
    Ok(())
}
