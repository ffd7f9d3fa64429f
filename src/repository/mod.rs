//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite through diesel-async's
//! `SyncConnectionWrapper`.

pub mod audit;
pub mod context;
pub mod document;
pub mod metadata;
pub mod models;
pub mod pool;
pub mod util;

pub use audit::{AuditQuery, AuditRepository};
pub use context::DbContext;
pub use document::{DocumentQuery, DocumentRepository, HashWrite, SortField};
pub use metadata::{MetadataRepository, MetadataUpsert};
pub use pool::{AsyncSqlitePool, DieselError};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a timestamp for storage.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexical order equal
/// to chronological order, so range filters can compare text.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Parse an optional `YYYY-MM-DD` date.
pub fn parse_date_opt(s: Option<&str>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
