//! Search and audit queries.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use super::super::auth::RequestActor;
use super::super::{ApiError, AppState};
use crate::services::{AuditFilter, SearchRequest};

/// `POST /api/documents/search`
pub async fn search_documents(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.search.search(&actor, request).await?;
    Ok(Json(page))
}

/// `GET /api/audit`
pub async fn query_audit(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(filter): Query<AuditFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.audit.query(&actor, filter).await?;
    Ok(Json(page))
}
