//! Document ingestion, access and lifecycle.

use std::sync::Arc;

use serde::Serialize;

use super::audit::AuditLog;
use super::dispatch::{EnrichmentDispatcher, EnrichmentJob};
use super::ServiceError;
use crate::clock;
use crate::models::{AuditAction, Document, EnrichmentStatus, FileDescriptor};
use crate::permissions::{self, Actor};
use crate::repository::{DbContext, DocumentRepository, HashWrite, MetadataRepository};
use crate::storage::{content_storage_key, file_extension, resolve_content_type, BlobStore};

/// An uploaded file plus the caller-supplied fields.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// Defaults to the file name.
    pub title: Option<String>,
    /// Owner to record; defaults to the uploader.
    pub owner_id: Option<String>,
    /// Defaults to the uploader's department.
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOutcome {
    pub is_duplicate: bool,
    /// The new document, or the existing one on a duplicate.
    pub document: Document,
    pub message: String,
}

/// Replacement file for an update.
#[derive(Debug, Clone)]
pub struct ReplacementFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub file: Option<ReplacementFile>,
}

/// Bytes and descriptor returned by a download.
#[derive(Debug, Clone)]
pub struct Download {
    pub file: FileDescriptor,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct DocumentService {
    documents: DocumentRepository,
    metadata: MetadataRepository,
    blobs: Arc<dyn BlobStore>,
    dispatcher: Arc<dyn EnrichmentDispatcher>,
    audit: AuditLog,
    public_url: String,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl DocumentService {
    pub fn new(
        ctx: &DbContext,
        blobs: Arc<dyn BlobStore>,
        dispatcher: Arc<dyn EnrichmentDispatcher>,
        audit: AuditLog,
        public_url: &str,
    ) -> Self {
        Self {
            documents: ctx.documents(),
            metadata: ctx.metadata(),
            blobs,
            dispatcher,
            audit,
            public_url: public_url.to_string(),
        }
    }

    /// Store an upload and start enrichment.
    ///
    /// Identical bytes already in the archive produce a duplicate outcome
    /// pointing at the existing document; nothing is written in that case.
    pub async fn add_document(
        &self,
        actor: &Actor,
        upload: Upload,
    ) -> Result<AddOutcome, ServiceError> {
        if !permissions::can_add(actor) {
            return Err(ServiceError::forbidden("upload documents"));
        }
        let owner_id = non_blank(upload.owner_id).unwrap_or_else(|| actor.id.clone());
        if !permissions::can_delegate_owner(actor, &owner_id) {
            return Err(ServiceError::forbidden("upload on behalf of another user"));
        }

        let file_name = upload.file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(ServiceError::Validation("file name is required".to_string()));
        }
        if upload.bytes.is_empty() {
            return Err(ServiceError::Validation("file is empty".to_string()));
        }

        let content_hash = Document::compute_hash(&upload.bytes);
        if let Some(existing) = self.documents.get_by_hash(&content_hash).await? {
            tracing::info!(
                "Upload of {} by {} duplicates document {}",
                file_name,
                actor.id,
                existing.id
            );
            return Ok(Self::duplicate_outcome(existing));
        }

        let content_type = resolve_content_type(&file_name, upload.content_type.as_deref());
        let title = non_blank(upload.title).unwrap_or_else(|| file_name.clone());
        let department = non_blank(upload.department).or_else(|| actor.department.clone());
        let mut doc = Document::new(
            title,
            FileDescriptor {
                name: file_name.clone(),
                content_type: content_type.clone(),
                size: upload.bytes.len() as u64,
                storage_path: String::new(),
            },
            content_hash,
            owner_id,
            department,
            clock::now(),
        );
        doc.file.storage_path = content_storage_key(
            &doc.content_hash,
            &doc.id,
            &file_extension(&file_name, &content_type),
        );

        self.blobs.save(&doc.file.storage_path, &upload.bytes).await?;
        match self.documents.insert(&doc).await {
            Ok(HashWrite::Applied) => {}
            Ok(HashWrite::Duplicate) => {
                // Lost a race with a concurrent upload of the same bytes.
                self.discard_blob(&doc.file.storage_path).await;
                return match self.documents.get_by_hash(&doc.content_hash).await? {
                    Some(existing) => Ok(Self::duplicate_outcome(existing)),
                    None => Err(ServiceError::Validation(
                        "concurrent upload of identical content, retry".to_string(),
                    )),
                };
            }
            Err(e) => {
                self.discard_blob(&doc.file.storage_path).await;
                return Err(e.into());
            }
        }

        doc.enrichment_status = self.dispatch_enrichment(&doc).await?;

        self.audit
            .record(
                actor,
                AuditAction::AddDocument,
                Some(&doc.id),
                format!(
                    "Uploaded '{}' ({}, {} bytes) for owner {}",
                    doc.title, doc.file.name, doc.file.size, doc.owner_id
                ),
            )
            .await?;

        let message = match doc.enrichment_status {
            EnrichmentStatus::Dispatched => "Document uploaded; enrichment started",
            _ => "Document uploaded; enrichment could not be started",
        };
        Ok(AddOutcome {
            is_duplicate: false,
            document: doc,
            message: message.to_string(),
        })
    }

    fn duplicate_outcome(existing: Document) -> AddOutcome {
        AddOutcome {
            is_duplicate: true,
            document: existing,
            message: "File already exists".to_string(),
        }
    }

    async fn discard_blob(&self, key: &str) {
        if let Err(e) = self.blobs.delete(key).await {
            tracing::warn!("Failed to remove orphaned blob {}: {}", key, e);
        }
    }

    /// Send a job for `doc` to the worker. Never fails on delivery problems;
    /// those are recorded on the document as `dispatch_failed`.
    async fn dispatch_enrichment(&self, doc: &Document) -> Result<EnrichmentStatus, ServiceError> {
        // Mark first: a fast worker may call back before dispatch returns.
        self.documents
            .set_enrichment_status(&doc.id, EnrichmentStatus::Dispatched, None)
            .await?;

        let delivered = match self.blobs.local_path(&doc.file.storage_path) {
            Ok(path) => {
                match EnrichmentJob::new(
                    &self.public_url,
                    &doc.id,
                    &doc.content_hash,
                    path.display().to_string(),
                    doc.department.clone(),
                ) {
                    Ok(job) => self.dispatcher.dispatch(&job).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                }
            }
            Err(e) => Err(e.to_string()),
        };

        match delivered {
            Ok(()) => Ok(EnrichmentStatus::Dispatched),
            Err(reason) => {
                tracing::warn!("Enrichment dispatch for {} failed: {}", doc.id, reason);
                self.documents
                    .transition_status(
                        &doc.id,
                        &[EnrichmentStatus::Dispatched],
                        EnrichmentStatus::DispatchFailed,
                        Some(&reason),
                    )
                    .await?;
                Ok(EnrichmentStatus::DispatchFailed)
            }
        }
    }

    async fn load(&self, id: &str) -> Result<Document, ServiceError> {
        self.documents
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::document_not_found(id))
    }

    pub async fn view(&self, actor: &Actor, id: &str) -> Result<Document, ServiceError> {
        let doc = self.load(id).await?;
        if !permissions::can_view(actor, &doc.owner_id) {
            return Err(ServiceError::forbidden("view this document"));
        }
        self.audit
            .record(
                actor,
                AuditAction::ViewDocument,
                Some(&doc.id),
                format!("Viewed '{}'", doc.title),
            )
            .await?;
        Ok(doc)
    }

    pub async fn download(&self, actor: &Actor, id: &str) -> Result<Download, ServiceError> {
        let doc = self.load(id).await?;
        if !permissions::can_download(actor, &doc.owner_id) {
            return Err(ServiceError::forbidden("download this document"));
        }
        let bytes = self.blobs.read(&doc.file.storage_path).await?;
        self.audit
            .record(
                actor,
                AuditAction::DownloadDocument,
                Some(&doc.id),
                format!("Downloaded '{}'", doc.file.name),
            )
            .await?;
        Ok(Download {
            file: doc.file,
            bytes,
        })
    }

    /// Change the title and/or replace the file. A replacement re-runs
    /// enrichment.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        update: DocumentUpdate,
    ) -> Result<Document, ServiceError> {
        let doc = self.load(id).await?;
        if !permissions::can_edit(actor, &doc.owner_id) {
            return Err(ServiceError::forbidden("edit this document"));
        }
        let title = non_blank(update.title);
        if title.is_none() && update.file.is_none() {
            return Err(ServiceError::Validation("nothing to update".to_string()));
        }

        let mut changes = Vec::new();
        let mut replaced = false;

        if let Some(file) = update.file {
            let file_name = file.file_name.trim().to_string();
            if file_name.is_empty() || file.bytes.is_empty() {
                return Err(ServiceError::Validation(
                    "replacement file needs a name and content".to_string(),
                ));
            }
            let content_hash = Document::compute_hash(&file.bytes);
            if content_hash != doc.content_hash {
                if let Some(other) = self.documents.get_by_hash(&content_hash).await? {
                    return Err(ServiceError::Duplicate {
                        existing_id: other.id,
                        existing_title: other.title,
                    });
                }

                let content_type = resolve_content_type(&file_name, file.content_type.as_deref());
                let descriptor = FileDescriptor {
                    storage_path: content_storage_key(
                        &content_hash,
                        &doc.id,
                        &file_extension(&file_name, &content_type),
                    ),
                    name: file_name,
                    content_type,
                    size: file.bytes.len() as u64,
                };
                self.blobs.save(&descriptor.storage_path, &file.bytes).await?;

                let write = self
                    .documents
                    .replace_file(&doc.id, &descriptor, &content_hash, &clock::now())
                    .await;
                match write {
                    Ok(HashWrite::Applied) => {}
                    Ok(HashWrite::Duplicate) => {
                        self.discard_blob(&descriptor.storage_path).await;
                        let other = self.documents.get_by_hash(&content_hash).await?;
                        return Err(ServiceError::Duplicate {
                            existing_id: other.as_ref().map(|o| o.id.clone()).unwrap_or_default(),
                            existing_title: other.map(|o| o.title).unwrap_or_default(),
                        });
                    }
                    Err(e) => {
                        self.discard_blob(&descriptor.storage_path).await;
                        return Err(e.into());
                    }
                }
                if descriptor.storage_path != doc.file.storage_path {
                    self.discard_blob(&doc.file.storage_path).await;
                }
                // Metadata derived from the old file is stale; reads report
                // processing until the new job calls back.
                self.metadata.delete(&doc.id).await?;
                self.documents.clear_metadata(&doc.id).await?;
                changes.push(format!("file -> {}", descriptor.name));
                replaced = true;
            }
        }

        if let Some(ref title) = title {
            self.documents
                .update_title(&doc.id, title, &clock::now())
                .await?;
            changes.push(format!("title -> '{}'", title));
        }

        let mut updated = self.load(id).await?;
        if replaced {
            updated.enrichment_status = self.dispatch_enrichment(&updated).await?;
        }

        self.audit
            .record(
                actor,
                AuditAction::UpdateDocument,
                Some(&doc.id),
                if changes.is_empty() {
                    "No effective change".to_string()
                } else {
                    format!("Updated {}", changes.join(", "))
                },
            )
            .await?;
        Ok(updated)
    }

    /// Remove the document, its metadata record and the blob.
    ///
    /// The document row goes first: once it is gone an in-flight callback
    /// writes nothing, and cleans up any metadata it upserted itself.
    pub async fn delete(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        let doc = self.load(id).await?;
        if !permissions::can_delete(actor, &doc.owner_id) {
            return Err(ServiceError::forbidden("delete this document"));
        }

        if !self.documents.delete(&doc.id).await? {
            return Err(ServiceError::document_not_found(&doc.id));
        }
        self.metadata.delete(&doc.id).await?;
        self.discard_blob(&doc.file.storage_path).await;

        self.audit
            .record(
                actor,
                AuditAction::DeleteDocument,
                Some(&doc.id),
                format!("Deleted '{}'", doc.title),
            )
            .await?;
        Ok(())
    }

    /// Dispatch enrichment again, e.g. after the worker was unreachable.
    pub async fn reprocess(&self, actor: &Actor, id: &str) -> Result<EnrichmentStatus, ServiceError> {
        let doc = self.load(id).await?;
        if !(permissions::can_write_enrichment(actor) || permissions::can_edit(actor, &doc.owner_id)) {
            return Err(ServiceError::forbidden("re-run enrichment"));
        }
        let status = self.dispatch_enrichment(&doc).await?;
        self.audit
            .record(
                actor,
                AuditAction::DispatchDocument,
                Some(&doc.id),
                format!("Re-dispatched enrichment: {}", status),
            )
            .await?;
        Ok(status)
    }
}
