//! Metadata endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::super::auth::RequestActor;
use super::super::{ApiError, AppState};
use crate::services::{MetadataInput, MetadataView};

/// `GET /api/documents/:id/metadata`
///
/// 202 while enrichment is still running, 404 once it has given up without
/// producing metadata.
pub async fn get_metadata(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let response = match state.services.metadata.view(&actor, &id).await? {
        MetadataView::Ready(meta) => Json(meta).into_response(),
        MetadataView::Pending { status } => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "processing",
                "enrichmentStatus": status,
                "message": "Metadata is being generated",
            })),
        )
            .into_response(),
        MetadataView::Failed { status, error } => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "status": "failed",
                "enrichmentStatus": status,
                "message": "Metadata could not be generated",
                "error": error,
            })),
        )
            .into_response(),
    };
    Ok(response)
}

/// `POST /api/documents/:id/metadata`
pub async fn add_metadata(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(input): Json<MetadataInput>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = state.services.metadata.add(&actor, &id, input).await?;
    Ok((StatusCode::CREATED, Json(meta)))
}

/// `PUT /api/documents/:id/metadata`
pub async fn update_metadata(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(input): Json<MetadataInput>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = state.services.metadata.update(&actor, &id, input).await?;
    Ok(Json(meta))
}
