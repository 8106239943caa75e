//! `tmining validate`

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use tmining_training::{validate_model, ArtifactRef, Columns, DatasetSource, ValidationSpec};

use crate::commands::types::ValidateArgs;
use crate::commands::Selected;
use crate::context::CliContext;

pub fn execute(ctx: &CliContext, args: ValidateArgs) -> Result<()> {
    let dataset = DatasetSource::path(&args.dataset);
    let columns = Columns { x: args.columns.x, y: args.columns.y };

    let evaluation = match args.selection.resolve()? {
        Selected::Registered { user, model } => ctx
            .service()?
            .validate_model(user, model, dataset, columns, args.size)
            .context("Validation failed")?,
        Selected::File(path) => {
            let mut spec =
                ValidationSpec::new(dataset, ArtifactRef::path(path)).with_size(args.size).with_seed(ctx.config.seed());
            spec.columns = columns;
            validate_model(&spec).context("Validation failed")?
        }
    };

    if ctx.json {
        return ctx.print_json(&json!({
            "accuracy": evaluation.accuracy,
            "f1": evaluation.f1,
            "rows": evaluation.evaluated_rows,
        }));
    }
    println!("{}", format!("Validated on {} rows", evaluation.evaluated_rows).bold().cyan());
    println!("  accuracy: {:.4}", evaluation.accuracy);
    println!("  f1:       {:.4}", evaluation.f1);
    Ok(())
}
