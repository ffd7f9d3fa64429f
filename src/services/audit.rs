//! Audit trail recording and querying.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ServiceError;
use crate::clock;
use crate::models::{AuditAction, AuditLogEntry};
use crate::permissions::{can_read_audit, Actor, Role};
use crate::repository::{AuditQuery, AuditRepository};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Audit query as received from callers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub actor_id: Option<String>,
    pub role: Option<String>,
    pub action: Option<String>,
    pub document_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    pub items: Vec<AuditLogEntry>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

#[derive(Clone, Debug)]
pub struct AuditLog {
    repo: AuditRepository,
}

impl AuditLog {
    pub fn new(repo: AuditRepository) -> Self {
        Self { repo }
    }

    /// Append one entry. A failure here fails the calling operation.
    pub async fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        document_id: Option<&str>,
        description: impl Into<String>,
    ) -> Result<AuditLogEntry, ServiceError> {
        let entry = AuditLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: clock::now(),
            actor_id: actor.id.clone(),
            actor_role: actor.role.as_str().to_string(),
            action,
            document_id: document_id.map(str::to_string),
            description: description.into(),
        };
        self.repo.append(&entry).await?;
        tracing::debug!(
            "audit {} by {} ({}) on {:?}",
            entry.action,
            entry.actor_id,
            entry.actor_role,
            entry.document_id
        );
        Ok(entry)
    }

    pub async fn query(&self, actor: &Actor, filter: AuditFilter) -> Result<AuditPage, ServiceError> {
        if !can_read_audit(actor) {
            return Err(ServiceError::forbidden("read the audit log"));
        }

        let action = match filter.action.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(name) => Some(
                AuditAction::from_str(name)
                    .ok_or_else(|| ServiceError::Validation(format!("unknown action {}", name)))?,
            ),
            None => None,
        };
        let actor_role = match filter.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(name) => Some(
                Role::from_str(name)
                    .ok_or_else(|| ServiceError::Validation(format!("unknown role {}", name)))?
                    .as_str()
                    .to_string(),
            ),
            None => None,
        };
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ServiceError::Validation("from is after to".to_string()));
            }
        }

        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let query = AuditQuery {
            actor_id: filter.actor_id.filter(|a| !a.is_empty()),
            actor_role,
            action,
            from: filter.from,
            to: filter.to,
            document_id: filter.document_id.filter(|d| !d.is_empty()),
            limit: page_size as i64,
            offset: (page as i64 - 1) * page_size as i64,
        };
        let (items, total) = self.repo.query(&query).await?;

        self.record(
            actor,
            AuditAction::ViewAuditLog,
            None,
            format!("Viewed audit log page {} ({} of {} entries)", page, items.len(), total),
        )
        .await?;

        Ok(AuditPage {
            items,
            page,
            page_size,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    async fn setup() -> (AuditLog, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (AuditLog::new(ctx.audit()), dir)
    }

    #[tokio::test]
    async fn test_user_cannot_read_audit() {
        let (log, _dir) = setup().await;
        let result = log
            .query(&Actor::new("u1", Role::User), AuditFilter::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_query_filters_by_role_and_action() {
        let (log, _dir) = setup().await;
        let user = Actor::new("u1", Role::User);
        let manager = Actor::new("m1", Role::Manager);
        log.record(&user, AuditAction::AddDocument, Some("d1"), "upload")
            .await
            .unwrap();
        log.record(&manager, AuditAction::ViewDocument, Some("d1"), "view")
            .await
            .unwrap();

        let page = log
            .query(
                &manager,
                AuditFilter {
                    role: Some("user".to_string()),
                    action: Some("adddocument".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].actor_id, "u1");
        assert_eq!(page.items[0].actor_role, "User");

        // The query itself was audited.
        let admin = Actor::new("a1", Role::Admin);
        let page = log
            .query(
                &admin,
                AuditFilter {
                    action: Some("ViewAuditLog".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].actor_id, "m1");
    }

    #[tokio::test]
    async fn test_unknown_action_rejected() {
        let (log, _dir) = setup().await;
        let result = log
            .query(
                &Actor::new("m1", Role::Manager),
                AuditFilter {
                    action: Some("Explode".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
