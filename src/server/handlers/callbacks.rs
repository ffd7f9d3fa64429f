//! Enrichment callbacks from the OCR worker.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;

use super::super::{ApiError, AppState};
use crate::services::{OcrCallback, OcrFailure, SyncOutcome, CALLBACK_TOKEN_HEADER};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackParams {
    pub document_id: String,
}

fn check_token(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.callback_token.as_deref() else {
        return Ok(());
    };
    let authorized = headers
        .get(CALLBACK_TOKEN_HEADER)
        .map(|v| v.as_bytes().ct_eq(expected.as_bytes()).into())
        .unwrap_or(false);
    if authorized {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid callback token".to_string()))
    }
}

fn outcome_body(outcome: &SyncOutcome) -> serde_json::Value {
    match outcome {
        SyncOutcome::Applied(doc) => json!({
            "applied": true,
            "enrichmentStatus": doc.enrichment_status,
        }),
        SyncOutcome::Skipped => json!({ "applied": false }),
    }
}

/// `POST /api/ocr/callback?documentId=`
///
/// A callback for a document that no longer exists is acknowledged and
/// ignored.
pub async fn ocr_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
    Json(result): Json<OcrCallback>,
) -> Result<impl IntoResponse, ApiError> {
    check_token(&state, &headers)?;
    let outcome = state
        .services
        .sync
        .apply_ocr_result(&params.document_id, result)
        .await?;
    Ok(Json(outcome_body(&outcome)))
}

/// `POST /api/ocr/failure?documentId=`
pub async fn ocr_failure(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
    Json(failure): Json<OcrFailure>,
) -> Result<impl IntoResponse, ApiError> {
    check_token(&state, &headers)?;
    let outcome = state
        .services
        .sync
        .record_failure(&params.document_id, &failure)
        .await?;
    Ok(Json(outcome_body(&outcome)))
}
