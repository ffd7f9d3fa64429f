//! Manual re-dispatch of enrichment.

use console::style;

use crate::config::Settings;
use crate::models::EnrichmentStatus;
use crate::permissions::Actor;
use crate::server::AppState;

/// Send a document to the OCR worker again.
pub async fn cmd_reprocess(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let state = AppState::from_settings(settings).await?;
    let status = state
        .services
        .documents
        .reprocess(&Actor::system(), id)
        .await?;

    match status {
        EnrichmentStatus::Dispatched => {
            println!(
                "{} Dispatched {} to {}",
                style("✓").green(),
                id,
                settings.worker_url
            );
            Ok(())
        }
        other => {
            eprintln!(
                "{} Could not reach the OCR worker at {} (status: {})",
                style("✗").red(),
                settings.worker_url,
                other
            );
            Err(anyhow::anyhow!("dispatch of {} failed", id))
        }
    }
}
