//! `tmining models ...`

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::json;

use crate::commands::types::ModelsCommand;
use crate::commands::{print_model_header, print_model_line};
use crate::context::CliContext;

pub fn execute(ctx: &CliContext, command: ModelsCommand) -> Result<()> {
    let service = ctx.service()?;

    match command {
        ModelsCommand::List { user, include_shared } => {
            let models = service.registry().list_models(&user, include_shared)?;
            if ctx.json {
                return ctx.print_json(&models);
            }
            println!();
            println!("{}", format!("Models ({})", models.len()).bold().cyan());
            println!();
            if models.is_empty() {
                println!("  {}", "No models registered for this user.".dimmed());
                return Ok(());
            }
            print_model_header();
            for model in &models {
                print_model_line(model);
            }
            Ok(())
        }

        ModelsCommand::Edit { user, model, name, shared } => {
            let Some(edited) = service.registry().edit_model(&user, &model, name.as_deref(), shared)? else {
                bail!("Model {model} not found for user {user}");
            };
            if ctx.json {
                return ctx.print_json(&edited);
            }
            print_model_line(&edited);
            Ok(())
        }

        ModelsCommand::Remove { user, model } => {
            let removed = service.delete(&user, &model)?;
            if ctx.json {
                return ctx.print_json(&json!({ "model": model, "removed": removed }));
            }
            if !removed {
                bail!("Model {model} not found for user {user}");
            }
            println!("{} {}", "Removed model".green(), model.cyan());
            Ok(())
        }

        ModelsCommand::Upload { user, file, name, shared } => {
            let bytes = std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let model = service.upload(&user, &bytes, &name, shared).context("Upload failed")?;
            if ctx.json {
                return ctx.print_json(&model);
            }
            println!("{} {}", "Uploaded model".bold().green(), model.identifier.cyan());
            println!("  name: {}", model.name);
            Ok(())
        }

        ModelsCommand::Download { user, model, output } => {
            let (record, bytes) = service.download(&user, &model).context("Download failed")?;
            std::fs::write(&output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
            if ctx.json {
                return ctx.print_json(&json!({ "model": record, "output": output }));
            }
            println!("{} {} -> {}", "Downloaded".green(), record.identifier.cyan(), output.display());
            Ok(())
        }
    }
}
