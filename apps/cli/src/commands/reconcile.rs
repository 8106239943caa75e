//! `tmining reconcile`

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use tracing::info;

use crate::context::CliContext;

pub fn execute(ctx: &CliContext, delete: bool) -> Result<()> {
    let orphans = ctx.service()?.reconcile(delete)?;
    info!(orphans = orphans.len(), deleted = delete, "Reconciled artifact store");

    if ctx.json {
        return ctx.print_json(&json!({ "orphans": orphans, "deleted": delete }));
    }
    if orphans.is_empty() {
        println!("{}", "Artifact store matches the registry.".green());
        return Ok(());
    }
    let verb = if delete { "Deleted" } else { "Found" };
    println!("{}", format!("{verb} {} orphaned artifact(s):", orphans.len()).bold().yellow());
    for id in orphans {
        println!("  {id}");
    }
    Ok(())
}
