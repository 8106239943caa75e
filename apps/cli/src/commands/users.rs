//! `tmining users ...`

use anyhow::{bail, Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde_json::{json, Value};
use tmining_core::{Claims, UserRecord};
use uuid::Uuid;

use crate::commands::types::UsersCommand;
use crate::commands::{print_model_header, print_model_line};
use crate::context::CliContext;

pub fn execute(ctx: &CliContext, command: UsersCommand) -> Result<()> {
    let service = ctx.service()?;

    match command {
        UsersCommand::Add { subject, identifier, credential, claims } => {
            let mut claims = parse_claims(claims.as_deref())?;
            claims.insert("sub".to_string(), Value::String(subject));
            let identifier = identifier.unwrap_or_else(|| Uuid::new_v4().to_string());

            let user = service.registry().add_user(&identifier, credential.as_deref(), &claims)?;
            if ctx.json {
                return ctx.print_json(&user);
            }
            println!("{} {} ({})", "Registered user".bold().green(), user.identifier.cyan(), user.subject);
            Ok(())
        }

        UsersCommand::Show { subject, identifier } => {
            let record = match (subject, identifier) {
                (Some(subject), _) => service.registry().get_user_by_subject(&subject)?,
                (None, Some(identifier)) => service.registry().get_user_by_identifier(&identifier)?,
                (None, None) => bail!("Pass --subject or --identifier"),
            };
            let Some(record) = record else {
                bail!("User not found");
            };
            if ctx.json {
                return ctx.print_json(&record);
            }
            print_user(&record);
            Ok(())
        }

        UsersCommand::Remove { identifier } => {
            let removed = service.remove_user(&identifier)?;
            if ctx.json {
                return ctx.print_json(&json!({ "user": identifier, "removed_models": removed }));
            }
            println!("{} {} ({} model(s))", "Removed user".green(), identifier.cyan(), removed.len());
            Ok(())
        }
    }
}

fn parse_claims(raw: Option<&str>) -> Result<Claims> {
    let Some(raw) = raw else {
        return Ok(Claims::new());
    };
    match serde_json::from_str(raw).context("--claims is not valid JSON")? {
        Value::Object(claims) => Ok(claims),
        _ => bail!("--claims must be a JSON object"),
    }
}

fn print_user(record: &UserRecord) {
    let user = &record.user;
    println!();
    println!("{}", user.subject.bold().cyan());
    println!("  identifier: {}", user.identifier);
    println!("  session:    {}", if user.session_is_valid(Utc::now()) { "valid".green() } else { "expired".dimmed() });
    println!();
    if record.models.is_empty() {
        println!("  {}", "No models.".dimmed());
        return;
    }
    print_model_header();
    for model in &record.models {
        print_model_line(model);
    }
}
