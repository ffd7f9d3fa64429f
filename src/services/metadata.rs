//! User-initiated metadata actions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::audit::AuditLog;
use super::ServiceError;
use crate::clock;
use crate::models::{AuditAction, Document, EnrichmentStatus, Metadata};
use crate::permissions::{self, Actor};
use crate::repository::{DbContext, DocumentRepository, MetadataRepository, MetadataUpsert};

/// Metadata fields supplied by a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInput {
    pub description: Option<String>,
    pub category: Option<String>,
    pub document_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub department: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

impl MetadataInput {
    fn into_upsert(self) -> MetadataUpsert {
        let clean = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        MetadataUpsert {
            description: clean(self.description),
            category: clean(self.category),
            document_type: clean(self.document_type),
            tags: Metadata::normalize_tags(self.tags),
            department: clean(self.department),
            expiration_date: self.expiration_date,
        }
    }
}

/// What a metadata read found.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum MetadataView {
    Ready(Metadata),
    /// Enrichment has not produced metadata yet.
    Pending { status: EnrichmentStatus },
    /// Enrichment gave up; metadata will not appear on its own.
    Failed {
        status: EnrichmentStatus,
        error: Option<String>,
    },
}

#[derive(Clone)]
pub struct MetadataService {
    documents: DocumentRepository,
    metadata: MetadataRepository,
    audit: AuditLog,
}

impl MetadataService {
    pub fn new(ctx: &DbContext, audit: AuditLog) -> Self {
        Self {
            documents: ctx.documents(),
            metadata: ctx.metadata(),
            audit,
        }
    }

    async fn load(&self, id: &str) -> Result<Document, ServiceError> {
        self.documents
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::document_not_found(id))
    }

    /// Create metadata for a document. Fails if a record already exists.
    pub async fn add(
        &self,
        actor: &Actor,
        document_id: &str,
        input: MetadataInput,
    ) -> Result<Metadata, ServiceError> {
        let doc = self.load(document_id).await?;
        if !permissions::can_edit_metadata(actor, &doc.owner_id) {
            return Err(ServiceError::forbidden("edit metadata of this document"));
        }
        if self.metadata.get(&doc.id).await?.is_some() {
            return Err(ServiceError::Validation(format!(
                "metadata for document {} already exists",
                doc.id
            )));
        }
        self.write(actor, &doc, input, AuditAction::AddMetadata).await
    }

    /// Replace metadata, creating it when absent.
    pub async fn update(
        &self,
        actor: &Actor,
        document_id: &str,
        input: MetadataInput,
    ) -> Result<Metadata, ServiceError> {
        let doc = self.load(document_id).await?;
        if !permissions::can_edit_metadata(actor, &doc.owner_id) {
            return Err(ServiceError::forbidden("edit metadata of this document"));
        }
        let action = if self.metadata.get(&doc.id).await?.is_some() {
            AuditAction::UpdateMetadata
        } else {
            AuditAction::AddMetadata
        };
        self.write(actor, &doc, input, action).await
    }

    async fn write(
        &self,
        actor: &Actor,
        doc: &Document,
        input: MetadataInput,
        action: AuditAction,
    ) -> Result<Metadata, ServiceError> {
        let values = input.into_upsert();
        let now = clock::now();

        let meta = self.metadata.upsert(&doc.id, &values, &now).await?;
        self.documents.project_metadata(&doc.id, &meta, &now).await?;
        if values.department.is_some() && values.department != doc.department {
            self.documents
                .set_department(&doc.id, values.department.as_deref(), &now)
                .await?;
        }

        self.audit
            .record(
                actor,
                action,
                Some(&doc.id),
                format!(
                    "Metadata revision {} (category {})",
                    meta.revision,
                    meta.category.as_deref().unwrap_or("-")
                ),
            )
            .await?;
        Ok(meta)
    }

    pub async fn view(&self, actor: &Actor, document_id: &str) -> Result<MetadataView, ServiceError> {
        let doc = self.load(document_id).await?;
        if !permissions::can_view_metadata(actor, &doc.owner_id) {
            return Err(ServiceError::forbidden("view metadata of this document"));
        }

        let view = match self.metadata.get(&doc.id).await? {
            Some(meta) => MetadataView::Ready(meta),
            None if doc.enrichment_status.is_in_flight() => MetadataView::Pending {
                status: doc.enrichment_status,
            },
            None => MetadataView::Failed {
                status: doc.enrichment_status,
                error: doc.enrichment_error.clone(),
            },
        };

        self.audit
            .record(
                actor,
                AuditAction::ViewMetadata,
                Some(&doc.id),
                match &view {
                    MetadataView::Ready(meta) => format!("Viewed metadata revision {}", meta.revision),
                    MetadataView::Pending { .. } => "Viewed metadata (processing)".to_string(),
                    MetadataView::Failed { .. } => "Viewed metadata (unavailable)".to_string(),
                },
            )
            .await?;
        Ok(view)
    }
}
