//! Document search with role-based scoping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::AuditLog;
use super::ServiceError;
use crate::models::{AuditAction, Document};
use crate::permissions::{self, Actor, SearchScope};
use crate::repository::{DbContext, DocumentQuery, DocumentRepository, SortField};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: Option<String>,
    pub category: Option<String>,
    pub department: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    /// `title` or `createdAt`.
    pub sort_by: Option<String>,
    /// Defaults to newest/last first.
    pub desc: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<Document>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

#[derive(Clone)]
pub struct SearchService {
    documents: DocumentRepository,
    audit: AuditLog,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl SearchService {
    pub fn new(ctx: &DbContext, audit: AuditLog) -> Self {
        Self {
            documents: ctx.documents(),
            audit,
        }
    }

    /// Users only ever see their own documents; managers and admins see all.
    pub async fn search(&self, actor: &Actor, req: SearchRequest) -> Result<SearchPage, ServiceError> {
        if let (Some(from), Some(to)) = (req.from_date, req.to_date) {
            if from > to {
                return Err(ServiceError::Validation("fromDate is after toDate".to_string()));
            }
        }
        let page = req.page.unwrap_or(1).max(1);
        let page_size = req
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let owner_id = match permissions::search_scope(actor) {
            SearchScope::All => None,
            SearchScope::OwnedBy(id) => Some(id),
        };
        let text = non_blank(req.query);

        let query = DocumentQuery {
            text: text.clone(),
            category: non_blank(req.category),
            department: non_blank(req.department),
            owner_id,
            created_from: req.from_date,
            created_to: req.to_date,
            sort: req.sort_by.as_deref().map(SortField::parse).unwrap_or_default(),
            descending: req.desc.unwrap_or(true),
            limit: page_size as i64,
            offset: (page as i64 - 1) * page_size as i64,
        };
        let (items, total) = self.documents.search(&query).await?;

        self.audit
            .record(
                actor,
                AuditAction::SearchDocuments,
                None,
                format!(
                    "Searched '{}' ({} result(s))",
                    text.as_deref().unwrap_or(""),
                    total
                ),
            )
            .await?;

        Ok(SearchPage {
            items,
            page,
            page_size,
            total,
        })
    }
}
