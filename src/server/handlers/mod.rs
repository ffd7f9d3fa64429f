//! HTTP request handlers.

mod callbacks;
mod dashboard;
mod documents;
mod metadata;
mod search;

pub use callbacks::{ocr_callback, ocr_failure};
pub use dashboard::{dashboard_totals, documents_by_department, documents_by_type};
pub use documents::{
    delete_document, download_document, get_document, update_document, upload_document,
};
pub use metadata::{add_metadata, get_metadata, update_metadata};
pub use search::{query_audit, search_documents};

use axum::{response::IntoResponse, Json};

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
