//! Audit log viewer.

use console::style;

use crate::config::Settings;
use crate::permissions::{Actor, Role};
use crate::services::{AuditFilter, AuditLog};

/// Operator identity recorded for CLI audit reads.
const CLI_ACTOR_ID: &str = "cli";

pub async fn cmd_audit(
    settings: &Settings,
    actor: Option<String>,
    action: Option<String>,
    limit: u32,
) -> anyhow::Result<()> {
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    let log = AuditLog::new(ctx.audit());

    let page = log
        .query(
            &Actor::new(CLI_ACTOR_ID, Role::Admin),
            AuditFilter {
                actor_id: actor,
                action,
                page_size: Some(limit),
                ..Default::default()
            },
        )
        .await?;

    if page.items.is_empty() {
        println!("{} No audit entries", style("!").yellow());
        return Ok(());
    }

    for entry in &page.items {
        println!(
            "{}  {:<18} {:<12} {:<8} {}  {}",
            style(entry.timestamp.format("%Y-%m-%d %H:%M:%S%.6f")).dim(),
            style(entry.action.as_str()).cyan(),
            entry.actor_id,
            entry.actor_role,
            entry.document_id.as_deref().unwrap_or("-"),
            entry.description
        );
    }
    println!(
        "\n{} of {} entries",
        page.items.len(),
        style(page.total).bold()
    );

    Ok(())
}
