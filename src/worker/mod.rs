//! OCR worker service.
//!
//! Accepts enrichment jobs over HTTP, answers 202 immediately and runs OCR
//! in the background, reporting the result to the job's callback URL. A
//! synchronous extract endpoint answers with the text directly.

mod extract;
mod jobs;

pub use extract::{extract_text, ExtractResponse, EXTRACT_PATH};
pub use jobs::{run_job, CallbackClient};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::ocr::{OcrPipeline, PdftoppmRasterizer, TesseractBackend};
use crate::server::MAX_UPLOAD_BYTES;
use crate::services::dispatch::PROCESS_PATH;
use crate::services::EnrichmentJob;

/// Shared state for the worker.
#[derive(Clone)]
pub struct WorkerState {
    pub pipeline: Arc<OcrPipeline>,
    /// Bounds the number of jobs OCRing at once.
    pub slots: Arc<Semaphore>,
    pub callbacks: CallbackClient,
}

impl WorkerState {
    pub fn new(
        pipeline: OcrPipeline,
        max_concurrent_jobs: usize,
        callbacks: CallbackClient,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            slots: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            callbacks,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let pipeline = OcrPipeline::new(
            Arc::new(TesseractBackend::new(settings.ocr.language.clone())),
            Arc::new(PdftoppmRasterizer::new(settings.ocr.dpi)),
        )
        .with_temp_root(settings.ocr.temp_dir.clone());
        let callbacks = CallbackClient::new(
            Duration::from_secs(settings.ocr.callback_timeout_secs),
            settings.callback_token.clone(),
        )?;
        Ok(Self::new(
            pipeline,
            settings.ocr.max_concurrent_jobs,
            callbacks,
        ))
    }
}

pub fn create_worker_router(state: WorkerState) -> Router {
    Router::new()
        .route(PROCESS_PATH, post(accept_job))
        .route(EXTRACT_PATH, post(extract_text))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

async fn accept_job(
    State(state): State<WorkerState>,
    payload: Result<Json<EnrichmentJob>, JsonRejection>,
) -> impl IntoResponse {
    let Json(job) = match payload {
        Ok(job) => job,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    if job.document_id.trim().is_empty() {
        return bad_request("documentId is required");
    }
    if job.file_path.trim().is_empty() {
        return bad_request("filePath is required");
    }
    if !Path::new(&job.file_path).is_file() {
        return bad_request("filePath does not exist");
    }
    if job.callback_url.trim().is_empty() {
        return bad_request("callbackUrl is required");
    }

    tracing::info!("Accepted job for document {} ({})", job.document_id, job.file_path);
    let document_id = job.document_id.clone();
    tokio::spawn(run_job(state, job));

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": true, "documentId": document_id })),
    )
        .into_response()
}

async fn health(State(state): State<WorkerState>) -> impl IntoResponse {
    let backend = state.pipeline.backend();
    Json(serde_json::json!({
        "status": "ok",
        "backend": backend.name(),
        "backendAvailable": backend.is_available(),
        "rasterizerAvailable": state.pipeline.rasterizer().is_available(),
        "freeSlots": state.slots.available_permits(),
    }))
}

/// Start the worker on `bind`.
pub async fn serve_worker(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let state = WorkerState::from_settings(settings)?;
    let backend = state.pipeline.backend();
    if !backend.is_available() {
        tracing::warn!("{}", backend.availability_hint());
    }
    let app = create_worker_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("OCR worker listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
