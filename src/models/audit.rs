//! Audit trail entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor id recorded for actions taken by the enrichment pipeline.
pub const SYSTEM_ACTOR_ID: &str = "system";

/// Kinds of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    AddDocument,
    ViewDocument,
    DownloadDocument,
    UpdateDocument,
    DeleteDocument,
    AddMetadata,
    UpdateMetadata,
    ViewMetadata,
    SearchDocuments,
    DispatchDocument,
    EnrichDocument,
    EnrichmentFailed,
    ViewAuditLog,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddDocument => "AddDocument",
            Self::ViewDocument => "ViewDocument",
            Self::DownloadDocument => "DownloadDocument",
            Self::UpdateDocument => "UpdateDocument",
            Self::DeleteDocument => "DeleteDocument",
            Self::AddMetadata => "AddMetadata",
            Self::UpdateMetadata => "UpdateMetadata",
            Self::ViewMetadata => "ViewMetadata",
            Self::SearchDocuments => "SearchDocuments",
            Self::DispatchDocument => "DispatchDocument",
            Self::EnrichDocument => "EnrichDocument",
            Self::EnrichmentFailed => "EnrichmentFailed",
            Self::ViewAuditLog => "ViewAuditLog",
        }
    }

    /// Case-insensitive parse, used for query filters.
    pub fn from_str(s: &str) -> Option<Self> {
        const ALL: [AuditAction; 13] = [
            AuditAction::AddDocument,
            AuditAction::ViewDocument,
            AuditAction::DownloadDocument,
            AuditAction::UpdateDocument,
            AuditAction::DeleteDocument,
            AuditAction::AddMetadata,
            AuditAction::UpdateMetadata,
            AuditAction::ViewMetadata,
            AuditAction::SearchDocuments,
            AuditAction::DispatchDocument,
            AuditAction::EnrichDocument,
            AuditAction::EnrichmentFailed,
            AuditAction::ViewAuditLog,
        ];
        ALL.into_iter().find(|a| a.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    /// Role name at the time of the action.
    pub actor_role: String,
    pub action: AuditAction,
    pub document_id: Option<String>,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse_is_case_insensitive() {
        assert_eq!(
            AuditAction::from_str("adddocument"),
            Some(AuditAction::AddDocument)
        );
        assert_eq!(
            AuditAction::from_str("EnrichmentFailed"),
            Some(AuditAction::EnrichmentFailed)
        );
        assert_eq!(AuditAction::from_str("nope"), None);
    }
}
