//! Hand-off of enrichment jobs to the OCR worker.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Path of the worker's job endpoint.
pub const PROCESS_PATH: &str = "/api/ocr/process";
/// Archive endpoint receiving OCR results.
pub const CALLBACK_PATH: &str = "/api/ocr/callback";
/// Archive endpoint receiving OCR failures.
pub const FAILURE_PATH: &str = "/api/ocr/failure";
/// Shared secret header on worker callbacks.
pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// One enrichment request. Sent once, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentJob {
    pub document_id: String,
    /// Hash of the file this job OCRs, echoed back on callbacks so results
    /// for a since-replaced file can be told apart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Path of the stored file, readable by the worker.
    pub file_path: String,
    pub callback_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_hint: Option<String>,
}

impl EnrichmentJob {
    /// Build a job whose callbacks point at `public_url`.
    pub fn new(
        public_url: &str,
        document_id: &str,
        content_hash: &str,
        file_path: String,
        department_hint: Option<String>,
    ) -> Result<Self, DispatchError> {
        Ok(Self {
            document_id: document_id.to_string(),
            content_hash: Some(content_hash.to_string()),
            file_path,
            callback_url: endpoint_url(public_url, CALLBACK_PATH, document_id)?,
            failure_url: Some(endpoint_url(public_url, FAILURE_PATH, document_id)?),
            department_hint,
        })
    }
}

/// Resolve `path` under `base`, keeping any path prefix `base` carries
/// (e.g. an app mounted at `/earchive/` behind a proxy).
fn join_under(base: &str, path: &str) -> Result<Url, DispatchError> {
    let root = format!("{}/", base.trim_end_matches('/'));
    Url::parse(&root)
        .and_then(|u| u.join(path.trim_start_matches('/')))
        .map_err(|e| DispatchError::InvalidUrl(format!("{}: {}", base, e)))
}

fn endpoint_url(base: &str, path: &str, document_id: &str) -> Result<String, DispatchError> {
    let mut url = join_under(base, path)?;
    url.query_pairs_mut().append_pair("documentId", document_id);
    Ok(url.to_string())
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("worker rejected job ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Sends jobs to an OCR worker. Delivery is best-effort: one attempt, no
/// retry.
#[async_trait]
pub trait EnrichmentDispatcher: Send + Sync {
    async fn dispatch(&self, job: &EnrichmentJob) -> Result<(), DispatchError>;
}

/// Dispatcher posting jobs as JSON to a worker over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDispatcher {
    pub fn new(worker_url: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let endpoint = join_under(worker_url, PROCESS_PATH)?.to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EnrichmentDispatcher for HttpDispatcher {
    async fn dispatch(&self, job: &EnrichmentJob) -> Result<(), DispatchError> {
        let response = self.client.post(&self.endpoint).json(job).send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::info!("Dispatched document {} to {}", job.document_id, self.endpoint);
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
