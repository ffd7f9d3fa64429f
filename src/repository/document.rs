//! Document repository.
//!
//! Apart from `insert` and `delete`, every write here is a field-level
//! update: concurrent writers touching different fields (OCR content versus
//! embedded metadata versus title) never clobber each other.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{DocumentRecord, NewDocument};
use super::pool::{AsyncSqlitePool, DieselError};
use super::util::{contains_pattern, is_unique_violation};
use super::{format_datetime, parse_date_opt, parse_datetime, parse_datetime_opt};
use crate::models::{Document, EnrichmentStatus, FileDescriptor, Metadata};
use crate::schema::documents;

/// Result of a write that can collide with the content-hash index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashWrite {
    Applied,
    /// Another document already holds this content hash.
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Title,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Parse a sort key; anything unrecognised sorts by creation time.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => SortField::Title,
            _ => SortField::CreatedAt,
        }
    }
}

/// Filters, ordering and paging for [`DocumentRepository::search`].
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    /// Case-insensitive substring over title, description, tags, category
    /// and document type.
    pub text: Option<String>,
    pub category: Option<String>,
    pub department: Option<String>,
    /// Restrict to one owner.
    pub owner_id: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub sort: SortField,
    pub descending: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            text: None,
            category: None,
            department: None,
            owner_id: None,
            created_from: None,
            created_to: None,
            sort: SortField::CreatedAt,
            descending: true,
            limit: 50,
            offset: 0,
        }
    }
}

/// Apply the filter half of a `DocumentQuery` to a boxed statement.
///
/// A macro rather than a function so the same filters can be applied to the
/// row query and the count query, which have different boxed types.
macro_rules! apply_filters {
    ($query:expr, $q:expr) => {{
        let q: &DocumentQuery = $q;
        let mut query = $query;
        if let Some(owner) = q.owner_id.clone() {
            query = query.filter(documents::owner_id.eq(owner));
        }
        if let Some(text) = q.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(text);
            query = query.filter(
                documents::title
                    .like(pattern.clone())
                    .escape('\\')
                    .or(documents::meta_description
                        .assume_not_null()
                        .like(pattern.clone())
                        .escape('\\'))
                    .or(documents::meta_tags
                        .assume_not_null()
                        .like(pattern.clone())
                        .escape('\\'))
                    .or(documents::meta_category
                        .assume_not_null()
                        .like(pattern.clone())
                        .escape('\\'))
                    .or(documents::meta_document_type
                        .assume_not_null()
                        .like(pattern)
                        .escape('\\')),
            );
        }
        if let Some(category) = q.category.clone() {
            query = query.filter(documents::meta_category.eq(category));
        }
        if let Some(department) = q.department.clone() {
            query = query.filter(documents::department.eq(department));
        }
        if let Some(from) = q.created_from.as_ref() {
            query = query.filter(documents::created_at.ge(format_datetime(from)));
        }
        if let Some(to) = q.created_to.as_ref() {
            query = query.filter(documents::created_at.le(format_datetime(to)));
        }
        query
    }};
}

#[derive(Clone, Debug)]
pub struct DocumentRepository {
    pool: AsyncSqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new document. A content-hash collision is reported as
    /// [`HashWrite::Duplicate`] rather than an error.
    pub async fn insert(&self, doc: &Document) -> Result<HashWrite, DieselError> {
        let mut conn = self.pool.get().await?;

        let created_at = format_datetime(&doc.created_at);
        let updated_at = format_datetime(&doc.updated_at);
        let new = NewDocument {
            id: &doc.id,
            title: &doc.title,
            content: doc.content.as_deref(),
            ocr_confidence: doc.ocr_confidence,
            file_name: &doc.file.name,
            content_type: &doc.file.content_type,
            file_size: doc.file.size as i64,
            storage_path: &doc.file.storage_path,
            content_hash: &doc.content_hash,
            owner_id: &doc.owner_id,
            department: doc.department.as_deref(),
            enrichment_status: doc.enrichment_status.as_str(),
            enrichment_error: doc.enrichment_error.as_deref(),
            created_at: &created_at,
            updated_at: &updated_at,
        };

        match diesel::insert_into(documents::table)
            .values(&new)
            .execute(&mut conn)
            .await
        {
            Ok(_) => Ok(HashWrite::Applied),
            Err(e) if is_unique_violation(&e) => Ok(HashWrite::Duplicate),
            Err(e) => Err(e),
        }
    }

    /// Get a document by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Document>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<DocumentRecord> = documents::table
            .find(id)
            .select(DocumentRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.map(Self::record_to_document))
    }

    /// Look up the document holding a content hash.
    pub async fn get_by_hash(&self, content_hash: &str) -> Result<Option<Document>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<DocumentRecord> = documents::table
            .filter(documents::content_hash.eq(content_hash))
            .select(DocumentRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.map(Self::record_to_document))
    }

    /// Store OCR output for the file with `content_hash`. Returns the number
    /// of rows touched: 0 if the document is gone or its file was replaced.
    pub async fn update_content(
        &self,
        id: &str,
        content_hash: &str,
        content: &str,
        confidence: Option<f32>,
        now: &DateTime<Utc>,
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let updated_at = format_datetime(now);

        diesel::update(
            documents::table
                .find(id)
                .filter(documents::content_hash.eq(content_hash)),
        )
        .set((
            documents::content.eq(Some(content)),
            documents::ocr_confidence.eq(confidence),
            documents::updated_at.eq(&updated_at),
        ))
        .execute(&mut conn)
        .await
    }

    pub async fn update_title(
        &self,
        id: &str,
        title: &str,
        now: &DateTime<Utc>,
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let updated_at = format_datetime(now);

        diesel::update(documents::table.find(id))
            .set((
                documents::title.eq(title),
                documents::updated_at.eq(&updated_at),
            ))
            .execute(&mut conn)
            .await
    }

    /// Point the document at new file content. OCR output is cleared and
    /// enrichment starts over.
    pub async fn replace_file(
        &self,
        id: &str,
        file: &FileDescriptor,
        content_hash: &str,
        now: &DateTime<Utc>,
    ) -> Result<HashWrite, DieselError> {
        let mut conn = self.pool.get().await?;
        let updated_at = format_datetime(now);

        let result = diesel::update(documents::table.find(id))
            .set((
                documents::file_name.eq(&file.name),
                documents::content_type.eq(&file.content_type),
                documents::file_size.eq(file.size as i64),
                documents::storage_path.eq(&file.storage_path),
                documents::content_hash.eq(content_hash),
                documents::content.eq(None::<String>),
                documents::ocr_confidence.eq(None::<f32>),
                documents::enrichment_status.eq(EnrichmentStatus::Pending.as_str()),
                documents::enrichment_error.eq(None::<String>),
                documents::updated_at.eq(&updated_at),
            ))
            .execute(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(HashWrite::Applied),
            Err(e) if is_unique_violation(&e) => Ok(HashWrite::Duplicate),
            Err(e) => Err(e),
        }
    }

    /// Copy a metadata record into the document's embedded columns.
    pub async fn project_metadata(
        &self,
        id: &str,
        meta: &Metadata,
        now: &DateTime<Utc>,
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;

        let tags = serde_json::to_string(&meta.tags).map_err(super::util::to_diesel_error)?;
        let expiration = meta
            .expiration_date
            .map(|d| d.format("%Y-%m-%d").to_string());
        let meta_created_at = format_datetime(&meta.created_at);
        let meta_updated_at = format_datetime(&meta.updated_at);
        let updated_at = format_datetime(now);

        diesel::update(documents::table.find(id))
            .set((
                documents::meta_description.eq(meta.description.as_deref()),
                documents::meta_category.eq(meta.category.as_deref()),
                documents::meta_document_type.eq(meta.document_type.as_deref()),
                documents::meta_tags.eq(Some(tags)),
                documents::meta_department.eq(meta.department.as_deref()),
                documents::meta_expiration_date.eq(expiration),
                documents::meta_revision.eq(Some(meta.revision)),
                documents::meta_created_at.eq(Some(meta_created_at)),
                documents::meta_updated_at.eq(Some(meta_updated_at)),
                documents::updated_at.eq(&updated_at),
            ))
            .execute(&mut conn)
            .await
    }

    /// Drop the embedded metadata copy.
    pub async fn clear_metadata(&self, id: &str) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::update(documents::table.find(id))
            .set((
                documents::meta_description.eq(None::<String>),
                documents::meta_category.eq(None::<String>),
                documents::meta_document_type.eq(None::<String>),
                documents::meta_tags.eq(None::<String>),
                documents::meta_department.eq(None::<String>),
                documents::meta_expiration_date.eq(None::<String>),
                documents::meta_revision.eq(None::<i64>),
                documents::meta_created_at.eq(None::<String>),
                documents::meta_updated_at.eq(None::<String>),
            ))
            .execute(&mut conn)
            .await
    }

    pub async fn set_department(
        &self,
        id: &str,
        department: Option<&str>,
        now: &DateTime<Utc>,
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let updated_at = format_datetime(now);

        diesel::update(documents::table.find(id))
            .set((
                documents::department.eq(department),
                documents::updated_at.eq(&updated_at),
            ))
            .execute(&mut conn)
            .await
    }

    pub async fn set_enrichment_status(
        &self,
        id: &str,
        status: EnrichmentStatus,
        error: Option<&str>,
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::update(documents::table.find(id))
            .set((
                documents::enrichment_status.eq(status.as_str()),
                documents::enrichment_error.eq(error),
            ))
            .execute(&mut conn)
            .await
    }

    /// Move to `to` only if the current status is one of `from`.
    ///
    /// Returns false when another writer (typically the enrichment callback)
    /// got there first.
    pub async fn transition_status(
        &self,
        id: &str,
        from: &[EnrichmentStatus],
        to: EnrichmentStatus,
        error: Option<&str>,
    ) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let rows = diesel::update(
            documents::table
                .find(id)
                .filter(documents::enrichment_status.eq_any(from)),
        )
        .set((
            documents::enrichment_status.eq(to.as_str()),
            documents::enrichment_error.eq(error),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    /// Delete a document row. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(documents::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    pub async fn count(&self) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        let total: i64 = documents::table.count().get_result(&mut conn).await?;
        Ok(total as u64)
    }

    /// Document counts per department; `None` groups documents without one.
    pub async fn count_by_department(&self) -> Result<Vec<(Option<String>, u64)>, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let rows: Vec<(Option<String>, i64)> = documents::table
            .group_by(documents::department)
            .select((documents::department, count_star()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(|(k, n)| (k, n as u64)).collect())
    }

    /// Counts per embedded document type, over documents that have metadata.
    pub async fn count_by_document_type(
        &self,
    ) -> Result<Vec<(Option<String>, u64)>, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let rows: Vec<(Option<String>, i64)> = documents::table
            .filter(documents::meta_revision.is_not_null())
            .group_by(documents::meta_document_type)
            .select((documents::meta_document_type, count_star()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(|(k, n)| (k, n as u64)).collect())
    }

    /// Filtered, sorted page of documents plus the unpaged total.
    pub async fn search(&self, q: &DocumentQuery) -> Result<(Vec<Document>, u64), DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count_query = apply_filters!(documents::table.select(count_star()).into_boxed(), q);
        let total: i64 = count_query.first(&mut conn).await?;

        let mut query = apply_filters!(
            documents::table
                .select(DocumentRecord::as_select())
                .into_boxed(),
            q
        );
        query = match (q.sort, q.descending) {
            (SortField::Title, false) => query.order(documents::title.asc()),
            (SortField::Title, true) => query.order(documents::title.desc()),
            (SortField::CreatedAt, false) => query.order(documents::created_at.asc()),
            (SortField::CreatedAt, true) => query.order(documents::created_at.desc()),
        };
        let records: Vec<DocumentRecord> = query
            .then_order_by(documents::id.asc())
            .limit(q.limit.max(1))
            .offset(q.offset.max(0))
            .load(&mut conn)
            .await?;

        let docs = records.into_iter().map(Self::record_to_document).collect();
        Ok((docs, total as u64))
    }

    fn record_to_document(record: DocumentRecord) -> Document {
        let created_at = parse_datetime(&record.created_at);
        let updated_at = parse_datetime(&record.updated_at);

        let metadata = match record.meta_revision {
            Some(revision) => Some(Metadata {
                id: record.id.clone(),
                description: record.meta_description,
                category: record.meta_category,
                document_type: record.meta_document_type,
                tags: record
                    .meta_tags
                    .as_deref()
                    .and_then(|t| serde_json::from_str(t).ok())
                    .unwrap_or_default(),
                department: record.meta_department,
                expiration_date: parse_date_opt(record.meta_expiration_date.as_deref()),
                revision,
                created_at: parse_datetime_opt(record.meta_created_at).unwrap_or(created_at),
                updated_at: parse_datetime_opt(record.meta_updated_at).unwrap_or(updated_at),
            }),
            None => None,
        };

        Document {
            id: record.id,
            title: record.title,
            content: record.content,
            ocr_confidence: record.ocr_confidence,
            file: FileDescriptor {
                name: record.file_name,
                content_type: record.content_type,
                size: record.file_size.max(0) as u64,
                storage_path: record.storage_path,
            },
            content_hash: record.content_hash,
            owner_id: record.owner_id,
            department: record.department,
            enrichment_status: EnrichmentStatus::from_str(&record.enrichment_status)
                .unwrap_or(EnrichmentStatus::Pending),
            enrichment_error: record.enrichment_error,
            created_at,
            updated_at,
            metadata,
        }
    }
}
