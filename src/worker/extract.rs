//! Synchronous text extraction for a single uploaded file.
//!
//! Unlike enrichment jobs, the caller waits for the text; nothing is stored
//! and no callback is made.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::WorkerState;
use crate::ocr::{OcrError, OcrOutcome};

/// Path of the worker's synchronous extract endpoint.
pub const EXTRACT_PATH: &str = "/api/ocr/extract";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ExtractResponse {
    fn new(outcome: OcrOutcome, language: Option<String>) -> Self {
        Self {
            text: outcome.text,
            confidence: outcome.confidence,
            page_count: outcome.page_count,
            language,
        }
    }
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn ocr_error(e: OcrError) -> Response {
    match e {
        OcrError::InvalidLanguage(_) => error(StatusCode::BAD_REQUEST, e.to_string()),
        OcrError::UnsupportedKind(_) | OcrError::NoPages => {
            error(StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
        }
        OcrError::BackendNotAvailable(_) => error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        other => {
            tracing::error!("Extraction failed: {}", other);
            error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// Scratch file name for an upload: only the lower-cased extension of the
/// client's name is kept, so kind detection still works.
fn scratch_name(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!("upload.{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| "upload".to_string())
}

/// `POST /api/ocr/extract` (multipart: `file`, `language?`)
pub async fn extract_text(State(state): State<WorkerState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut language: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error(StatusCode::BAD_REQUEST, e.body_text()),
        };
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(e) => return error(StatusCode::BAD_REQUEST, e.body_text()),
                }
            }
            Some("language") => match field.text().await {
                Ok(text) => language = Some(text.trim().to_string()).filter(|l| !l.is_empty()),
                Err(e) => return error(StatusCode::BAD_REQUEST, e.body_text()),
            },
            _ => {}
        }
    }

    let Some((file_name, bytes)) = upload.filter(|(_, bytes)| !bytes.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "No file uploaded");
    };

    let pipeline = match language.as_deref() {
        Some(language) => match state.pipeline.for_language(language) {
            Ok(pipeline) => pipeline,
            Err(e) => return ocr_error(e),
        },
        None => state.pipeline.as_ref().clone(),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix("earchive-extract-");
    let scratch = match pipeline.temp_root() {
        Some(root) => std::fs::create_dir_all(root).and_then(|_| builder.tempdir_in(root)),
        None => builder.tempdir(),
    };
    let scratch = match scratch {
        Ok(dir) => dir,
        Err(e) => return ocr_error(OcrError::Io(e)),
    };
    let path = scratch.path().join(scratch_name(&file_name));
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        return ocr_error(OcrError::Io(e));
    }

    let _permit = match state.slots.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return error(StatusCode::SERVICE_UNAVAILABLE, "worker is shutting down"),
    };
    tracing::info!("Extracting text from {} ({} bytes)", file_name, bytes.len());

    // The scratch dir moves into the task so it outlives the OCR run.
    let result = tokio::task::spawn_blocking(move || {
        let outcome = pipeline.process(&path);
        drop(scratch);
        outcome
    })
    .await;

    match result {
        Ok(Ok(outcome)) => Json(ExtractResponse::new(outcome, language)).into_response(),
        Ok(Err(e)) => ocr_error(e),
        Err(e) => {
            tracing::error!("Extraction task panicked: {}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "extraction failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrBackend, OcrPipeline, PageText, Rasterizer};
    use crate::worker::{create_worker_router, CallbackClient};
    use axum::body::Body;
    use axum::http::Request;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "earchive-extract-boundary";

    /// Prefixes the file contents with the configured language.
    struct LanguageEchoBackend {
        language: String,
    }

    impl OcrBackend for LanguageEchoBackend {
        fn name(&self) -> &'static str {
            "language-echo"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        fn ocr_image(&self, image_path: &Path) -> Result<PageText, OcrError> {
            Ok(PageText {
                text: format!("[{}] {}", self.language, std::fs::read_to_string(image_path)?),
                confidence: Some(0.7),
            })
        }

        fn with_language(&self, language: &str) -> Option<Arc<dyn OcrBackend>> {
            Some(Arc::new(Self {
                language: language.to_string(),
            }))
        }
    }

    struct NoRasterizer;

    impl Rasterizer for NoRasterizer {
        fn rasterize(&self, _pdf: &Path, _out_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
            Ok(Vec::new())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn app() -> axum::Router {
        let pipeline = OcrPipeline::new(
            Arc::new(LanguageEchoBackend {
                language: "eng".to_string(),
            }),
            Arc::new(NoRasterizer),
        );
        create_worker_router(WorkerState::new(
            pipeline,
            1,
            CallbackClient::new(Duration::from_secs(1), None).unwrap(),
        ))
    }

    fn extract_request(file_name: &str, bytes: &[u8], language: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(language) = language {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\n{}\r\n",
                    BOUNDARY, language
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(EXTRACT_PATH)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_scratch_name_keeps_only_extension() {
        assert_eq!(scratch_name("Scan 01.PNG"), "upload.png");
        assert_eq!(scratch_name("../../etc/passwd"), "upload");
        assert_eq!(scratch_name("report.p;df"), "upload");
    }

    #[tokio::test]
    async fn test_extract_returns_text_in_requested_language() {
        let response = app()
            .oneshot(extract_request("scan.png", b"INVOICE 9", Some("ara+eng")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "[ara+eng] INVOICE 9");
        assert_eq!(body["pageCount"], 1);
        assert_eq!(body["language"], "ara+eng");
    }

    #[tokio::test]
    async fn test_extract_defaults_to_configured_language() {
        let response = app()
            .oneshot(extract_request("scan.png", b"hello", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "[eng] hello");
        assert!(body.get("language").is_none());
    }

    #[tokio::test]
    async fn test_extract_rejects_bad_input() {
        let response = app()
            .oneshot(extract_request("scan.png", b"", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(extract_request("scan.png", b"text", Some("eng -c x")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(extract_request("notes.xyz", b"plain words", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = app()
            .oneshot(extract_request("empty.pdf", b"%PDF-1.4", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
