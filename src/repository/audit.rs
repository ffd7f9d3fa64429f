//! Append-only audit log storage.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{AuditLogRecord, NewAuditLog};
use super::pool::{AsyncSqlitePool, DieselError};
use super::{format_datetime, parse_datetime};
use crate::models::{AuditAction, AuditLogEntry, SYSTEM_ACTOR_ID};
use crate::schema::audit_log;

/// Filters and paging for audit queries.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub actor_role: Option<String>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub document_id: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            actor_id: None,
            actor_role: None,
            action: None,
            from: None,
            to: None,
            document_id: None,
            limit: 50,
            offset: 0,
        }
    }
}

macro_rules! apply_filters {
    ($query:expr, $q:expr) => {{
        let q: &AuditQuery = $q;
        let mut query = $query;
        if let Some(actor) = q.actor_id.clone() {
            query = query.filter(audit_log::actor_id.eq(actor));
        }
        if let Some(role) = q.actor_role.clone() {
            query = query.filter(audit_log::actor_role.eq(role));
        }
        if let Some(action) = q.action {
            query = query.filter(audit_log::action.eq(action.as_str()));
        }
        if let Some(document_id) = q.document_id.clone() {
            query = query.filter(audit_log::document_id.eq(document_id));
        }
        if let Some(from) = q.from.as_ref() {
            query = query.filter(audit_log::timestamp.ge(format_datetime(from)));
        }
        if let Some(to) = q.to.as_ref() {
            query = query.filter(audit_log::timestamp.le(format_datetime(to)));
        }
        query
    }};
}

/// The repository exposes append and query only; entries are never
/// modified or removed.
#[derive(Clone, Debug)]
pub struct AuditRepository {
    pool: AsyncSqlitePool,
}

impl AuditRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, entry: &AuditLogEntry) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let timestamp = format_datetime(&entry.timestamp);
        let row = NewAuditLog {
            id: &entry.id,
            timestamp: &timestamp,
            actor_id: &entry.actor_id,
            actor_role: &entry.actor_role,
            action: entry.action.as_str(),
            document_id: entry.document_id.as_deref(),
            description: &entry.description,
        };

        diesel::insert_into(audit_log::table)
            .values(&row)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Newest-first page of matching entries and the total match count.
    pub async fn query(&self, q: &AuditQuery) -> Result<(Vec<AuditLogEntry>, u64), DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let total: i64 = apply_filters!(audit_log::table.select(count_star()).into_boxed(), q)
            .first(&mut conn)
            .await?;

        let records: Vec<AuditLogRecord> = apply_filters!(
            audit_log::table
                .select(AuditLogRecord::as_select())
                .into_boxed(),
            q
        )
        .order(audit_log::timestamp.desc())
        .then_order_by(audit_log::id.desc())
        .limit(q.limit.max(1))
        .offset(q.offset.max(0))
        .load(&mut conn)
        .await?;

        let entries = records
            .into_iter()
            .filter_map(Self::record_to_entry)
            .collect();
        Ok((entries, total as u64))
    }

    /// Number of `action` entries at or after `since`.
    pub async fn count_since(
        &self,
        action: AuditAction,
        since: &DateTime<Utc>,
    ) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        let total: i64 = audit_log::table
            .filter(audit_log::action.eq(action.as_str()))
            .filter(audit_log::timestamp.ge(format_datetime(since)))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok(total as u64)
    }

    /// Distinct actors that appear in the log, the pipeline excluded.
    pub async fn count_actors(&self) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_distinct;
        let total: i64 = audit_log::table
            .filter(audit_log::actor_id.ne(SYSTEM_ACTOR_ID))
            .select(count_distinct(audit_log::actor_id))
            .first(&mut conn)
            .await?;
        Ok(total as u64)
    }

    fn record_to_entry(record: AuditLogRecord) -> Option<AuditLogEntry> {
        let Some(action) = AuditAction::from_str(&record.action) else {
            tracing::warn!("Skipping audit entry {} with unknown action {}", record.id, record.action);
            return None;
        };
        Some(AuditLogEntry {
            id: record.id,
            timestamp: parse_datetime(&record.timestamp),
            actor_id: record.actor_id,
            actor_role: record.actor_role,
            action,
            document_id: record.document_id,
            description: record.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    fn entry(actor: &str, role: &str, action: AuditAction) -> AuditLogEntry {
        AuditLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: crate::clock::now(),
            actor_id: actor.to_string(),
            actor_role: role.to_string(),
            action,
            document_id: Some("doc-1".to_string()),
            description: format!("{} by {}", action, actor),
        }
    }

    #[tokio::test]
    async fn test_append_and_query() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.audit();

        let first = entry("u1", "User", AuditAction::AddDocument);
        let second = entry("m1", "Manager", AuditAction::ViewDocument);
        let third = entry("u1", "User", AuditAction::ViewDocument);
        for e in [&first, &second, &third] {
            repo.append(e).await.unwrap();
        }

        let (all, total) = repo.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all[0].id, third.id);
        assert_eq!(all[2].id, first.id);

        let (by_actor, total) = repo
            .query(&AuditQuery {
                actor_id: Some("u1".to_string()),
                action: Some(AuditAction::ViewDocument),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(by_actor[0].id, third.id);

        let (window, total) = repo
            .query(&AuditQuery {
                from: Some(second.timestamp),
                to: Some(second.timestamp),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(window[0].id, second.id);

        let (page, total) = repo
            .query(&AuditQuery {
                limit: 2,
                offset: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, first.id);
    }

    #[tokio::test]
    async fn test_counts_by_action_and_actor() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.audit();

        let mut old = entry("u1", "User", AuditAction::AddDocument);
        old.timestamp = old.timestamp - chrono::Duration::days(2);
        repo.append(&old).await.unwrap();
        let cutoff = crate::clock::now();
        for e in [
            entry("u1", "User", AuditAction::AddDocument),
            entry("u2", "User", AuditAction::AddDocument),
            entry("u2", "User", AuditAction::UpdateDocument),
            entry(SYSTEM_ACTOR_ID, "System", AuditAction::EnrichDocument),
        ] {
            repo.append(&e).await.unwrap();
        }

        assert_eq!(repo.count_since(AuditAction::AddDocument, &cutoff).await.unwrap(), 2);
        assert_eq!(
            repo.count_since(AuditAction::UpdateDocument, &cutoff).await.unwrap(),
            1
        );
        assert_eq!(repo.count_actors().await.unwrap(), 2);
    }
}
