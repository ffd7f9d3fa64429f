//! Diesel async connection management for SQLite.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! for SQLite. Since SQLite connections are lightweight, we create new
//! connections per request rather than pooling.

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};
use std::path::Path;

/// Diesel error type alias.
pub type DieselError = diesel::result::Error;

/// Async SQLite connection using SyncConnectionWrapper.
pub type AsyncSqliteConnection = SyncConnectionWrapper<SqliteConnection>;

/// A simple async connection factory for SQLite.
#[derive(Clone, Debug)]
pub struct AsyncSqlitePool {
    database_url: String,
}

impl AsyncSqlitePool {
    pub fn new(database_url: &str) -> Self {
        // Strip sqlite: prefix if present for diesel
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    pub fn from_path(db_path: &Path) -> Self {
        Self::new(&db_path.display().to_string())
    }

    /// Get a new connection.
    ///
    /// Each connection waits on a locked database instead of failing
    /// immediately, since the archive and its callback handler write
    /// concurrently.
    pub async fn get(&self) -> Result<AsyncSqliteConnection, DieselError> {
        let mut conn = AsyncSqliteConnection::establish(&self.database_url)
            .await
            .map_err(super::util::to_diesel_error)?;
        conn.batch_execute("PRAGMA busy_timeout = 5000;")
            .await?;
        Ok(conn)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}
