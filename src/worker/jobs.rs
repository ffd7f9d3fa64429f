//! Background execution of accepted jobs.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::WorkerState;
use crate::ocr::OcrOutcome;
use crate::services::{EnrichmentJob, OcrCallback, OcrFailure, CALLBACK_TOKEN_HEADER};

/// Posts job results back to the archive.
#[derive(Debug, Clone)]
pub struct CallbackClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl CallbackClient {
    pub fn new(timeout: Duration, token: Option<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, token })
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), String> {
        let mut request = self.client.post(url).json(body);
        if let Some(ref token) = self.token {
            request = request.header(CALLBACK_TOKEN_HEADER, token);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("callback returned {}", response.status()))
        }
    }
}

impl From<OcrOutcome> for OcrCallback {
    fn from(outcome: OcrOutcome) -> Self {
        Self {
            text: outcome.text,
            confidence: outcome.confidence,
            page_count: Some(outcome.page_count as u32),
            content_hash: None,
        }
    }
}

/// Run one job to completion and report the result.
///
/// Waits for a free slot, OCRs on a blocking thread and posts either the
/// text to `callback_url` or the error to `failure_url`. Callback delivery
/// is attempted once.
pub async fn run_job(state: WorkerState, job: EnrichmentJob) {
    let _permit = match state.slots.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            tracing::error!("Worker shutting down, dropping job {}", job.document_id);
            return;
        }
    };

    tracing::info!("Starting OCR for document {}", job.document_id);
    let pipeline = state.pipeline.clone();
    let path = PathBuf::from(&job.file_path);
    let result = tokio::task::spawn_blocking(move || pipeline.process(&path))
        .await
        .map_err(|e| format!("OCR task panicked: {}", e))
        .and_then(|r| r.map_err(|e| e.to_string()));

    match result {
        Ok(outcome) => {
            tracing::info!(
                "OCR for document {} done: {} page(s)",
                job.document_id,
                outcome.page_count
            );
            let body = OcrCallback {
                content_hash: job.content_hash.clone(),
                ..OcrCallback::from(outcome)
            };
            if let Err(e) = state.callbacks.post(&job.callback_url, &body).await {
                tracing::error!("Delivering result for {} failed: {}", job.document_id, e);
            }
        }
        Err(error) => {
            tracing::warn!("OCR for document {} failed: {}", job.document_id, error);
            let Some(ref failure_url) = job.failure_url else {
                return;
            };
            let body = OcrFailure {
                error,
                content_hash: job.content_hash.clone(),
            };
            if let Err(e) = state.callbacks.post(failure_url, &body).await {
                tracing::error!("Reporting failure for {} failed: {}", job.document_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrBackend, OcrError, OcrPipeline, PageText, Rasterizer};
    use crate::worker::create_worker_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    struct FileContentsBackend;

    impl OcrBackend for FileContentsBackend {
        fn name(&self) -> &'static str {
            "file-contents"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        fn ocr_image(&self, image_path: &Path) -> Result<PageText, OcrError> {
            Ok(PageText {
                text: std::fs::read_to_string(image_path)?,
                confidence: Some(0.5),
            })
        }
    }

    struct NoRasterizer;

    impl Rasterizer for NoRasterizer {
        fn rasterize(&self, _pdf: &Path, _out_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
            Err(OcrError::RasterizeFailed("not in tests".to_string()))
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    fn state() -> WorkerState {
        let pipeline = OcrPipeline::new(Arc::new(FileContentsBackend), Arc::new(NoRasterizer));
        WorkerState::new(
            pipeline,
            1,
            CallbackClient::new(Duration::from_secs(5), Some("secret".to_string())).unwrap(),
        )
    }

    fn job_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ocr/process")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_rejects_missing_file() {
        let app = create_worker_router(state());
        let response = app
            .oneshot(job_request(serde_json::json!({
                "documentId": "d1",
                "filePath": "/definitely/not/here.png",
                "callbackUrl": "http://127.0.0.1:1/cb",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rejects_missing_callback_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.png");
        std::fs::write(&file, "text").unwrap();

        let app = create_worker_router(state());
        let response = app
            .oneshot(job_request(serde_json::json!({
                "documentId": "d1",
                "filePath": file.display().to_string(),
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    type Received = Arc<Mutex<Vec<(String, Option<String>, serde_json::Value)>>>;

    /// Local archive stand-in recording every callback.
    async fn spawn_receiver() -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let record = |kind: &'static str, received: Received| {
            move |headers: axum::http::HeaderMap, Json(body): Json<serde_json::Value>| {
                let received = received.clone();
                async move {
                    let token = headers
                        .get(CALLBACK_TOKEN_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    received.lock().unwrap().push((kind.to_string(), token, body));
                    StatusCode::OK
                }
            }
        };
        let app = Router::new()
            .route("/cb", post(record("callback", received.clone())))
            .route("/fail", post(record("failure", received.clone())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), received)
    }

    async fn wait_for(received: &Received) -> (String, Option<String>, serde_json::Value) {
        for _ in 0..200 {
            if let Some(first) = received.lock().unwrap().first().cloned() {
                return first;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("no callback received");
    }

    #[tokio::test]
    async fn test_job_posts_text_to_callback() {
        let (base, received) = spawn_receiver().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.png");
        std::fs::write(&file, "INVOICE 7  \n").unwrap();

        run_job(
            state(),
            EnrichmentJob {
                document_id: "d1".to_string(),
                content_hash: Some("hash-d1".to_string()),
                file_path: file.display().to_string(),
                callback_url: format!("{}/cb", base),
                failure_url: Some(format!("{}/fail", base)),
                department_hint: None,
            },
        )
        .await;

        let (kind, token, body) = wait_for(&received).await;
        assert_eq!(kind, "callback");
        assert_eq!(token.as_deref(), Some("secret"));
        assert_eq!(body["text"], "INVOICE 7");
        assert_eq!(body["pageCount"], 1);
        assert_eq!(body["confidence"], 0.5);
        assert_eq!(body["contentHash"], "hash-d1");
    }

    #[tokio::test]
    async fn test_unsupported_kind_posts_failure() {
        let (base, received) = spawn_receiver().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.xyz");
        std::fs::write(&file, "plain words").unwrap();

        run_job(
            state(),
            EnrichmentJob {
                document_id: "d2".to_string(),
                content_hash: Some("hash-d2".to_string()),
                file_path: file.display().to_string(),
                callback_url: format!("{}/cb", base),
                failure_url: Some(format!("{}/fail", base)),
                department_hint: None,
            },
        )
        .await;

        let (kind, _, body) = wait_for(&received).await;
        assert_eq!(kind, "failure");
        assert!(body["error"].as_str().unwrap().contains(".xyz"));
        assert_eq!(body["contentHash"], "hash-d2");
    }
}
