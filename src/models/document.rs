//! Archived documents.
//!
//! A document is identified by a generated id and deduplicated by the SHA-256
//! of its bytes. OCR text and the embedded metadata snapshot arrive later,
//! through the enrichment callback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Metadata;

/// Where a document stands in the enrichment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Stored, no job sent yet.
    Pending,
    /// Job accepted by the worker.
    Dispatched,
    /// Worker could not be reached; needs a manual re-dispatch.
    DispatchFailed,
    /// Callback applied.
    Completed,
    /// Worker reported a failure.
    Failed,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::DispatchFailed => "dispatch_failed",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "dispatched" => Some(Self::Dispatched),
            "dispatch_failed" => Some(Self::DispatchFailed),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether enrichment is still expected to produce metadata on its own.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Dispatched)
    }
}

impl std::fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored file behind a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Original file name as uploaded.
    pub name: String,
    pub content_type: String,
    pub size: u64,
    /// Blob store key.
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    /// OCR text; `None` until the first successful enrichment.
    pub content: Option<String>,
    pub ocr_confidence: Option<f32>,
    pub file: FileDescriptor,
    pub content_hash: String,
    pub owner_id: String,
    pub department: Option<String>,
    pub enrichment_status: EnrichmentStatus,
    pub enrichment_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Snapshot of the metadata record as of the last projection.
    pub metadata: Option<Metadata>,
}

impl Document {
    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Create a fresh document shell awaiting enrichment.
    pub fn new(
        title: String,
        file: FileDescriptor,
        content_hash: String,
        owner_id: String,
        department: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            content: None,
            ocr_confidence: None,
            file,
            content_hash,
            owner_id,
            department,
            enrichment_status: EnrichmentStatus::Pending,
            enrichment_error: None,
            created_at: now,
            updated_at: now,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash_is_lowercase_hex() {
        let hash = Document::compute_hash(b"hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            EnrichmentStatus::Pending,
            EnrichmentStatus::Dispatched,
            EnrichmentStatus::DispatchFailed,
            EnrichmentStatus::Completed,
            EnrichmentStatus::Failed,
        ] {
            assert_eq!(EnrichmentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(EnrichmentStatus::from_str("bogus"), None);
    }
}
