use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::ServiceError;

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(format!("invalid multipart body: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Service(e) => match e {
                ServiceError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
                ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
                ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
                ServiceError::Duplicate {
                    existing_id,
                    existing_title,
                } => (
                    StatusCode::CONFLICT,
                    json!({
                        "message": "File already exists",
                        "existingDocumentId": existing_id,
                        "existingTitle": existing_title,
                    }),
                ),
                other => {
                    tracing::error!("Request failed: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": other.to_string() }),
                    )
                }
            },
        };
        (status, Json(body)).into_response()
    }
}
