//! `tmining predict`

use anyhow::{Context, Result};
use serde_json::json;
use tmining_training::{predict, ArtifactRef};

use crate::commands::types::PredictArgs;
use crate::commands::Selected;
use crate::context::CliContext;

pub fn execute(ctx: &CliContext, args: PredictArgs) -> Result<()> {
    let label = match args.selection.resolve()? {
        Selected::Registered { user, model } => {
            ctx.service()?.predict_with_model(user, model, &args.text).context("Prediction failed")?
        }
        Selected::File(path) => predict(&ArtifactRef::path(path), &args.text).context("Prediction failed")?,
    };

    if ctx.json {
        return ctx.print_json(&json!({ "label": label }));
    }
    println!("{label}");
    Ok(())
}
