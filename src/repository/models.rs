//! Diesel ORM models for database tables.

use diesel::prelude::*;

use crate::schema;

/// Document record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub ocr_confidence: Option<f32>,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub storage_path: String,
    pub content_hash: String,
    pub owner_id: String,
    pub department: Option<String>,
    pub enrichment_status: String,
    pub enrichment_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub meta_description: Option<String>,
    pub meta_category: Option<String>,
    pub meta_document_type: Option<String>,
    pub meta_tags: Option<String>,
    pub meta_department: Option<String>,
    pub meta_expiration_date: Option<String>,
    pub meta_revision: Option<i64>,
    pub meta_created_at: Option<String>,
    pub meta_updated_at: Option<String>,
}

/// New document for insertion. Embedded metadata starts empty.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::documents)]
pub struct NewDocument<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub content: Option<&'a str>,
    pub ocr_confidence: Option<f32>,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub file_size: i64,
    pub storage_path: &'a str,
    pub content_hash: &'a str,
    pub owner_id: &'a str,
    pub department: Option<&'a str>,
    pub enrichment_status: &'a str,
    pub enrichment_error: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Metadata record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::metadata)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MetadataRecord {
    pub id: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub document_type: Option<String>,
    pub tags: String,
    pub department: Option<String>,
    pub expiration_date: Option<String>,
    pub revision: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Full metadata row for replace-style upserts.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::metadata)]
pub struct NewMetadata<'a> {
    pub id: &'a str,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub document_type: Option<&'a str>,
    pub tags: &'a str,
    pub department: Option<&'a str>,
    pub expiration_date: Option<&'a str>,
    pub revision: i64,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Audit log record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::audit_log)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuditLogRecord {
    pub id: String,
    pub timestamp: String,
    pub actor_id: String,
    pub actor_role: String,
    pub action: String,
    pub document_id: Option<String>,
    pub description: String,
}

/// New audit log entry for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::audit_log)]
pub struct NewAuditLog<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub actor_id: &'a str,
    pub actor_role: &'a str,
    pub action: &'a str,
    pub document_id: Option<&'a str>,
    pub description: &'a str,
}
