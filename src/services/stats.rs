//! Archive-wide counts for the dashboard.
//!
//! Reads only; nothing here is audited.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use super::ServiceError;
use crate::clock;
use crate::models::AuditAction;
use crate::permissions::{self, Actor};
use crate::repository::{AuditRepository, DbContext, DocumentRepository};

/// Group name for documents without a department or document type.
pub const UNKNOWN_GROUP: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub total_documents: u64,
    /// Distinct people seen in the audit log.
    pub total_users: u64,
    /// Uploads since midnight UTC.
    pub today_uploads: u64,
    /// Document updates since the first of the month, UTC.
    pub monthly_updates: u64,
}

#[derive(Clone)]
pub struct StatsService {
    documents: DocumentRepository,
    audit: AuditRepository,
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap_or(today);
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}

/// Fold nullable group keys into a sorted map.
fn into_groups(rows: Vec<(Option<String>, u64)>) -> BTreeMap<String, u64> {
    let mut groups = BTreeMap::new();
    for (key, count) in rows {
        let key = key
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
        *groups.entry(key).or_insert(0) += count;
    }
    groups
}

impl StatsService {
    pub fn new(ctx: &DbContext) -> Self {
        Self {
            documents: ctx.documents(),
            audit: ctx.audit(),
        }
    }

    fn authorize(actor: &Actor) -> Result<(), ServiceError> {
        if permissions::can_read_stats(actor) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("read archive statistics"))
        }
    }

    pub async fn totals(&self, actor: &Actor) -> Result<DashboardTotals, ServiceError> {
        Self::authorize(actor)?;
        let now = clock::now();

        Ok(DashboardTotals {
            total_documents: self.documents.count().await?,
            total_users: self.audit.count_actors().await?,
            today_uploads: self
                .audit
                .count_since(AuditAction::AddDocument, &start_of_day(now))
                .await?,
            monthly_updates: self
                .audit
                .count_since(AuditAction::UpdateDocument, &start_of_month(now))
                .await?,
        })
    }

    pub async fn documents_by_department(
        &self,
        actor: &Actor,
    ) -> Result<BTreeMap<String, u64>, ServiceError> {
        Self::authorize(actor)?;
        Ok(into_groups(self.documents.count_by_department().await?))
    }

    /// Counts per document type, over documents that have metadata.
    pub async fn documents_by_type(
        &self,
        actor: &Actor,
    ) -> Result<BTreeMap<String, u64>, ServiceError> {
        Self::authorize(actor)?;
        Ok(into_groups(self.documents.count_by_document_type().await?))
    }
}
