//! Applies enrichment results reported by the OCR worker.
//!
//! Each step is its own field-level write. A crash between steps leaves
//! earlier results (the OCR text in particular) persisted; a repeated
//! callback simply runs every step again.

use serde::{Deserialize, Serialize};

use super::audit::AuditLog;
use super::ServiceError;
use crate::analysis;
use crate::clock;
use crate::models::{AuditAction, Document, EnrichmentStatus, Metadata};
use crate::permissions::{self, Actor};
use crate::repository::{DbContext, DocumentRepository, MetadataRepository, MetadataUpsert};

/// Body of a successful enrichment callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrCallback {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Hash of the file the text came from, as given in the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Body of a failure callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Applied(Box<Document>),
    /// Nothing was written: the document is gone, its file was replaced
    /// since the job was issued, or enrichment already settled.
    Skipped,
}

/// Whether a result reported for `reported_hash` belongs to an older file.
fn is_stale(doc: &Document, reported_hash: Option<&str>) -> bool {
    reported_hash.is_some_and(|hash| hash != doc.content_hash)
}

#[derive(Clone)]
pub struct MetadataSynchronizer {
    documents: DocumentRepository,
    metadata: MetadataRepository,
    audit: AuditLog,
    actor: Actor,
}

impl MetadataSynchronizer {
    pub fn new(ctx: &DbContext, audit: AuditLog) -> Self {
        Self {
            documents: ctx.documents(),
            metadata: ctx.metadata(),
            audit,
            actor: Actor::system(),
        }
    }

    /// Store OCR text, derive metadata from it and project that metadata
    /// onto the document.
    pub async fn apply_ocr_result(
        &self,
        document_id: &str,
        result: OcrCallback,
    ) -> Result<SyncOutcome, ServiceError> {
        if !permissions::can_write_enrichment(&self.actor) {
            return Err(ServiceError::forbidden("write enrichment results"));
        }
        let Some(doc) = self.documents.get(document_id).await? else {
            tracing::info!("Enrichment result for unknown document {}, ignoring", document_id);
            return Ok(SyncOutcome::Skipped);
        };
        if is_stale(&doc, result.content_hash.as_deref()) {
            tracing::info!("Enrichment result for a replaced file of {}, ignoring", doc.id);
            return Ok(SyncOutcome::Skipped);
        }

        let written = self
            .documents
            .update_content(
                &doc.id,
                &doc.content_hash,
                &result.text,
                result.confidence,
                &clock::now(),
            )
            .await?;
        if written == 0 {
            return Ok(SyncOutcome::Skipped);
        }

        let extracted = analysis::extract(&result.text, doc.department.as_deref());
        let values = MetadataUpsert {
            description: extracted.description,
            category: Some(extracted.category),
            document_type: Some(extracted.document_type),
            tags: Metadata::normalize_tags(extracted.tags),
            department: extracted.department,
            expiration_date: extracted.expiration_date,
        };
        let meta = self.metadata.upsert(&doc.id, &values, &clock::now()).await?;

        let projected = self
            .documents
            .project_metadata(&doc.id, &meta, &clock::now())
            .await?;
        if projected == 0 {
            // Deleted mid-sync; don't leave an orphaned record behind.
            self.metadata.delete(&doc.id).await?;
            return Ok(SyncOutcome::Skipped);
        }
        self.documents
            .set_enrichment_status(&doc.id, EnrichmentStatus::Completed, None)
            .await?;

        self.audit
            .record(
                &self.actor,
                AuditAction::EnrichDocument,
                Some(&doc.id),
                format!(
                    "Enriched from {} page(s): {}/{}, revision {}",
                    result
                        .page_count
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                    meta.category.as_deref().unwrap_or("-"),
                    meta.document_type.as_deref().unwrap_or("-"),
                    meta.revision
                ),
            )
            .await?;

        tracing::info!(
            "Document {} enriched (category {:?}, revision {})",
            doc.id,
            meta.category,
            meta.revision
        );

        match self.documents.get(&doc.id).await? {
            Some(updated) => Ok(SyncOutcome::Applied(Box::new(updated))),
            None => Ok(SyncOutcome::Skipped),
        }
    }

    /// Record that the worker gave up on a document.
    ///
    /// Only an outstanding job can fail: a failure for a replaced file, or
    /// one arriving after enrichment already settled, is ignored.
    pub async fn record_failure(
        &self,
        document_id: &str,
        failure: &OcrFailure,
    ) -> Result<SyncOutcome, ServiceError> {
        if !permissions::can_write_enrichment(&self.actor) {
            return Err(ServiceError::forbidden("write enrichment results"));
        }
        let Some(doc) = self.documents.get(document_id).await? else {
            return Ok(SyncOutcome::Skipped);
        };
        if is_stale(&doc, failure.content_hash.as_deref()) {
            tracing::info!("Enrichment failure for a replaced file of {}, ignoring", doc.id);
            return Ok(SyncOutcome::Skipped);
        }

        let moved = self
            .documents
            .transition_status(
                &doc.id,
                &[EnrichmentStatus::Pending, EnrichmentStatus::Dispatched],
                EnrichmentStatus::Failed,
                Some(&failure.error),
            )
            .await?;
        if !moved {
            tracing::info!(
                "Enrichment failure for {} arrived with status {}, ignoring",
                doc.id,
                doc.enrichment_status
            );
            return Ok(SyncOutcome::Skipped);
        }

        self.audit
            .record(
                &self.actor,
                AuditAction::EnrichmentFailed,
                Some(&doc.id),
                format!("Enrichment failed: {}", failure.error),
            )
            .await?;
        tracing::warn!("Enrichment of {} failed: {}", doc.id, failure.error);

        match self.documents.get(&doc.id).await? {
            Some(updated) => Ok(SyncOutcome::Applied(Box::new(updated))),
            None => Ok(SyncOutcome::Skipped),
        }
    }
}
