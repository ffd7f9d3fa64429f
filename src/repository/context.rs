//! Database context for repository access.
//!
//! Create one context per command or service, then use it to access all
//! repositories.
//!
//! # Example
//! ```ignore
//! let ctx = DbContext::new(&db_path);
//! ctx.init_schema().await?;
//! let doc = ctx.documents().get("doc-1").await?;
//! ```

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::audit::AuditRepository;
use super::document::DocumentRepository;
use super::metadata::MetadataRepository;
use super::pool::{AsyncSqlitePool, DieselError};

#[derive(Clone, Debug)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    /// Create a new database context from a file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    /// Create a new database context from a `sqlite:` URL or bare path.
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(database_url),
        }
    }

    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    pub fn metadata(&self) -> MetadataRepository {
        MetadataRepository::new(self.pool.clone())
    }

    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(self.pool.clone())
    }

    /// Create tables and indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(
            r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT,
                ocr_confidence REAL,
                file_name TEXT NOT NULL,
                content_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                storage_path TEXT NOT NULL,
                content_hash TEXT NOT NULL UNIQUE,
                owner_id TEXT NOT NULL,
                department TEXT,
                enrichment_status TEXT NOT NULL DEFAULT 'pending',
                enrichment_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                meta_description TEXT,
                meta_category TEXT,
                meta_document_type TEXT,
                meta_tags TEXT,
                meta_department TEXT,
                meta_expiration_date TEXT,
                meta_revision INTEGER,
                meta_created_at TEXT,
                meta_updated_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_id);
            CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at);
            CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(meta_category);

            CREATE TABLE IF NOT EXISTS metadata (
                id TEXT PRIMARY KEY,
                description TEXT,
                category TEXT,
                document_type TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                department TEXT,
                expiration_date TEXT,
                revision INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                actor_role TEXT NOT NULL,
                action TEXT NOT NULL,
                document_id TEXT,
                description TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_actor ON audit_log(actor_id);
            CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_log(action);
            "#,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        ctx.init_schema().await.unwrap();

        let (docs, total) = ctx
            .documents()
            .search(&crate::repository::DocumentQuery::default())
            .await
            .unwrap();
        assert!(docs.is_empty());
        assert_eq!(total, 0);
    }
}
