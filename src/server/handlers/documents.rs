//! Document upload, retrieval, update and deletion.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::super::auth::RequestActor;
use super::super::{ApiError, AppState};
use crate::services::{DocumentUpdate, ReplacementFile, Upload};

/// Multipart fields shared by upload and update.
#[derive(Default)]
struct DocumentForm {
    file: Option<ReplacementFile>,
    title: Option<String>,
    owner_id: Option<String>,
    department: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<DocumentForm, ApiError> {
    let mut form = DocumentForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(ReplacementFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => form.title = Some(field.text().await?),
            "ownerId" => form.owner_id = Some(field.text().await?),
            "department" => form.department = Some(field.text().await?),
            other => tracing::debug!("Ignoring multipart field {}", other),
        }
    }
    Ok(form)
}

/// `POST /api/documents`
pub async fn upload_document(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;

    let outcome = state
        .services
        .documents
        .add_document(
            &actor,
            Upload {
                file_name: file.file_name,
                content_type: file.content_type,
                bytes: file.bytes,
                title: form.title,
                owner_id: form.owner_id,
                department: form.department,
            },
        )
        .await?;

    let doc = &outcome.document;
    if outcome.is_duplicate {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "message": outcome.message,
                "existingDocumentId": doc.id,
                "existingTitle": doc.title,
            })),
        )
            .into_response());
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": doc.id,
            "title": doc.title,
            "fileName": doc.file.name,
            "size": doc.file.size,
            "enrichmentStatus": doc.enrichment_status,
            "message": outcome.message,
        })),
    )
        .into_response())
}

/// `GET /api/documents/:id`
pub async fn get_document(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.services.documents.view(&actor, &id).await?;
    Ok(Json(doc))
}

/// `GET /api/documents/:id/download`
pub async fn download_document(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let download = state.services.documents.download(&actor, &id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.file.name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, download.file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    ))
}

/// `PUT /api/documents/:id`
pub async fn update_document(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart).await?;
    let doc = state
        .services
        .documents
        .update(
            &actor,
            &id,
            DocumentUpdate {
                title: form.title,
                file: form.file,
            },
        )
        .await?;
    Ok(Json(doc))
}

/// `DELETE /api/documents/:id`
pub async fn delete_document(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.documents.delete(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
