//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;
use crate::services::dispatch::{CALLBACK_PATH, FAILURE_PATH};

/// Largest accepted upload body.
pub(crate) const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Documents
        .route("/api/documents", post(handlers::upload_document))
        .route("/api/documents/search", post(handlers::search_documents))
        .route(
            "/api/documents/:id",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route(
            "/api/documents/:id/download",
            get(handlers::download_document),
        )
        .route(
            "/api/documents/:id/metadata",
            get(handlers::get_metadata)
                .post(handlers::add_metadata)
                .put(handlers::update_metadata),
        )
        // Audit
        .route("/api/audit", get(handlers::query_audit))
        // Dashboard
        .route("/api/dashboard/totals", get(handlers::dashboard_totals))
        .route(
            "/api/dashboard/documents-by-department",
            get(handlers::documents_by_department),
        )
        .route(
            "/api/dashboard/documents-by-type",
            get(handlers::documents_by_type),
        )
        // Worker callbacks
        .route(CALLBACK_PATH, post(handlers::ocr_callback))
        .route(FAILURE_PATH, post(handlers::ocr_failure))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
