//! Dashboard statistics, for managers and admins.

use axum::{extract::State, response::IntoResponse, Json};

use super::super::auth::RequestActor;
use super::super::{ApiError, AppState};

/// `GET /api/dashboard/totals`
pub async fn dashboard_totals(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.stats.totals(&actor).await?))
}

/// `GET /api/dashboard/documents-by-department`
pub async fn documents_by_department(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.services.stats.documents_by_department(&actor).await?,
    ))
}

/// `GET /api/dashboard/documents-by-type`
pub async fn documents_by_type(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.stats.documents_by_type(&actor).await?))
}
