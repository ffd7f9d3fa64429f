//! Metadata repository.
//!
//! Metadata rows share their id with the document they describe and are
//! only ever upserted, never duplicated.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{MetadataRecord, NewMetadata};
use super::pool::{AsyncSqlitePool, DieselError};
use super::util::to_diesel_error;
use super::{format_datetime, parse_date_opt, parse_datetime};
use crate::models::Metadata;
use crate::schema::metadata;

/// Field values for an upsert. Revision and timestamps are managed by the
/// repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataUpsert {
    pub description: Option<String>,
    pub category: Option<String>,
    pub document_type: Option<String>,
    pub tags: Vec<String>,
    pub department: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Clone, Debug)]
pub struct MetadataRepository {
    pool: AsyncSqlitePool,
}

impl MetadataRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Metadata>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<MetadataRecord> = metadata::table
            .find(id)
            .select(MetadataRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.map(Self::record_to_metadata))
    }

    /// Insert or replace the record for `id`.
    ///
    /// `created_at` survives replacement and `revision` is bumped by one,
    /// inside a single transaction.
    pub async fn upsert(
        &self,
        id: &str,
        values: &MetadataUpsert,
        now: &DateTime<Utc>,
    ) -> Result<Metadata, DieselError> {
        let mut conn = self.pool.get().await?;

        let tags = serde_json::to_string(&values.tags).map_err(to_diesel_error)?;
        let expiration = values
            .expiration_date
            .map(|d| d.format("%Y-%m-%d").to_string());
        let now_str = format_datetime(now);

        let record = conn
            .transaction(|conn| {
                Box::pin(async move {
                    let existing: Option<(String, i64)> = metadata::table
                        .find(id)
                        .select((metadata::created_at, metadata::revision))
                        .first(conn)
                        .await
                        .optional()?;

                    let (created_at, revision) = match existing {
                        Some((created_at, revision)) => (created_at, revision + 1),
                        None => (now_str.clone(), 1),
                    };

                    let row = NewMetadata {
                        id,
                        description: values.description.as_deref(),
                        category: values.category.as_deref(),
                        document_type: values.document_type.as_deref(),
                        tags: &tags,
                        department: values.department.as_deref(),
                        expiration_date: expiration.as_deref(),
                        revision,
                        created_at: &created_at,
                        updated_at: &now_str,
                    };

                    diesel::replace_into(metadata::table)
                        .values(&row)
                        .execute(conn)
                        .await?;

                    metadata::table
                        .find(id)
                        .select(MetadataRecord::as_select())
                        .first::<MetadataRecord>(conn)
                        .await
                })
            })
            .await?;

        Ok(Self::record_to_metadata(record))
    }

    /// Delete the record. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(metadata::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    fn record_to_metadata(record: MetadataRecord) -> Metadata {
        Metadata {
            id: record.id,
            description: record.description,
            category: record.category,
            document_type: record.document_type,
            tags: serde_json::from_str(&record.tags).unwrap_or_default(),
            department: record.department,
            expiration_date: parse_date_opt(record.expiration_date.as_deref()),
            revision: record.revision,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    async fn setup_test_db() -> (MetadataRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx.metadata(), dir)
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_and_bumps_revision() {
        let (repo, _dir) = setup_test_db().await;
        assert!(repo.get("doc-1").await.unwrap().is_none());

        let first_at = crate::clock::now();
        let first = repo
            .upsert(
                "doc-1",
                &MetadataUpsert {
                    category: Some("Financial".to_string()),
                    tags: vec!["tax".to_string()],
                    ..Default::default()
                },
                &first_at,
            )
            .await
            .unwrap();
        assert_eq!(first.revision, 1);
        assert_eq!(first.created_at, first_at);

        let second_at = crate::clock::now();
        let second = repo
            .upsert(
                "doc-1",
                &MetadataUpsert {
                    category: Some("Legal".to_string()),
                    expiration_date: NaiveDate::from_ymd_opt(2030, 1, 1),
                    ..Default::default()
                },
                &second_at,
            )
            .await
            .unwrap();
        assert_eq!(second.revision, 2);
        assert_eq!(second.created_at, first_at);
        assert_eq!(second.updated_at, second_at);
        assert_eq!(second.category.as_deref(), Some("Legal"));
        assert!(second.tags.is_empty());

        assert_eq!(repo.get("doc-1").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert("doc-2", &MetadataUpsert::default(), &crate::clock::now())
            .await
            .unwrap();
        assert!(repo.delete("doc-2").await.unwrap());
        assert!(!repo.delete("doc-2").await.unwrap());
    }
}
