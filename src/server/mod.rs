//! HTTP API of the archive service.
//!
//! Callers are identified by headers set by the gateway in front of the
//! service (see [`auth`]). The worker reports back through the callback
//! routes.

pub mod auth;
mod error;
mod handlers;
mod routes;

pub use error::ApiError;
pub(crate) use routes::MAX_UPLOAD_BYTES;
pub use routes::create_router;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::services::{EnrichmentDispatcher, HttpDispatcher, Services};
use crate::storage::LocalBlobStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Expected `X-Callback-Token` on worker callbacks, when set.
    pub callback_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(services: Services, callback_token: Option<String>) -> Self {
        Self {
            services,
            callback_token: callback_token.map(Arc::from),
        }
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        settings.ensure_directories()?;
        let ctx = settings.create_db_context();
        ctx.init_schema().await?;

        let blobs = Arc::new(LocalBlobStore::new(settings.blobs_dir()));
        let dispatcher: Arc<dyn EnrichmentDispatcher> = Arc::new(HttpDispatcher::new(
            &settings.worker_url,
            Duration::from_secs(settings.dispatch_timeout_secs),
        )?);
        let services = Services::new(&ctx, blobs, dispatcher, &settings.public_url);

        Ok(Self::new(services, settings.callback_token.clone()))
    }
}

/// Start the archive service on `bind`.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let state = AppState::from_settings(settings).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);
    tracing::info!("Dispatching enrichment jobs to {}", settings.worker_url);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::repository::DbContext;
    use crate::services::testing::RecordingDispatcher;

    const BOUNDARY: &str = "earchive-test-boundary";

    async fn setup_test_app(token: Option<&str>) -> (axum::Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let blobs = Arc::new(LocalBlobStore::new(dir.path().join("blobs")));
        let services = Services::new(
            &ctx,
            blobs,
            Arc::new(RecordingDispatcher::default()),
            "http://archive.test",
        );
        let app = create_router(AppState::new(services, token.map(str::to_string)));
        (app, dir)
    }

    fn multipart_body(file_name: &str, bytes: &[u8], title: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(title) = title {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{}\r\n",
                    BOUNDARY, title
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/plain\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(actor: (&str, &str), file_name: &str, bytes: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/documents")
            .header(auth::ACTOR_ID_HEADER, actor.0)
            .header(auth::ACTOR_ROLE_HEADER, actor.1)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(file_name, bytes, Some("Quarterly"))))
            .unwrap()
    }

    fn get_as(uri: &str, actor: (&str, &str)) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(auth::ACTOR_ID_HEADER, actor.0)
            .header(auth::ACTOR_ROLE_HEADER, actor.1)
            .body(Body::empty())
            .unwrap()
    }

    fn callback_request(doc_id: &str, text: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/ocr/callback?documentId={}", doc_id))
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(crate::services::CALLBACK_TOKEN_HEADER, token);
        }
        builder
            .body(Body::from(
                serde_json::json!({ "text": text, "confidence": 0.8, "pageCount": 1 }).to_string(),
            ))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = setup_test_app(None).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_actor_is_unauthorized() {
        let (app, _dir) = setup_test_app(None).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/documents/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_system_role_cannot_be_asserted() {
        let (app, _dir) = setup_test_app(None).await;
        let response = app
            .oneshot(get_as("/api/documents/abc", ("x", "system")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upload_then_duplicate_conflict() {
        let (app, _dir) = setup_test_app(None).await;

        let response = app
            .clone()
            .oneshot(upload_request(("u1", "user"), "report.txt", b"hello archive"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["title"], "Quarterly");
        assert_eq!(created["fileName"], "report.txt");
        assert_eq!(created["size"], 13);

        let response = app
            .oneshot(upload_request(("u2", "User"), "copy.txt", b"hello archive"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let conflict = json_body(response).await;
        assert_eq!(conflict["existingDocumentId"], created["id"]);
        assert_eq!(conflict["existingTitle"], "Quarterly");
        assert_eq!(conflict["message"], "File already exists");
    }

    #[tokio::test]
    async fn test_admin_upload_is_forbidden() {
        let (app, _dir) = setup_test_app(None).await;
        let response = app
            .oneshot(upload_request(("a1", "admin"), "report.txt", b"bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_metadata_pending_then_ready_after_callback() {
        let (app, _dir) = setup_test_app(Some("s3cret")).await;
        let created = json_body(
            app.clone()
                .oneshot(upload_request(("u1", "user"), "inv.txt", b"invoice bytes"))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        let metadata_uri = format!("/api/documents/{}/metadata", id);

        let response = app
            .clone()
            .oneshot(get_as(&metadata_uri, ("u1", "user")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(response).await["status"], "processing");

        let response = app
            .clone()
            .oneshot(callback_request(&id, "INVOICE total due", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(callback_request(&id, "INVOICE total due", Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["applied"], true);

        let response = app
            .clone()
            .oneshot(get_as(&metadata_uri, ("u1", "user")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let meta = json_body(response).await;
        assert_eq!(meta["category"], "Financial");
        assert_eq!(meta["documentType"], "Invoice");

        let doc = json_body(
            app.oneshot(get_as(&format!("/api/documents/{}", id), ("u1", "user")))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(doc["metadata"]["category"], meta["category"]);
        assert_eq!(doc["metadata"]["revision"], meta["revision"]);
        assert_eq!(doc["enrichmentStatus"], "completed");
    }

    #[tokio::test]
    async fn test_callback_for_unknown_document_is_acknowledged() {
        let (app, _dir) = setup_test_app(None).await;
        let response = app
            .oneshot(callback_request("nope", "text", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["applied"], false);
    }

    #[tokio::test]
    async fn test_download_and_audit_visibility() {
        let (app, _dir) = setup_test_app(None).await;
        let created = json_body(
            app.clone()
                .oneshot(upload_request(("u1", "user"), "a.txt", b"download me"))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(get_as(&format!("/api/documents/{}/download", id), ("u2", "user")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(get_as(&format!("/api/documents/{}/download", id), ("u1", "user")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"download me");

        let response = app
            .clone()
            .oneshot(get_as("/api/audit", ("u1", "user")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(get_as(
                &format!("/api/audit?documentId={}&action=DownloadDocument", id),
                ("m1", "manager"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["actorId"], "u1");
    }

    #[tokio::test]
    async fn test_search_is_scoped_for_users() {
        let (app, _dir) = setup_test_app(None).await;
        for (owner, bytes) in [("u1", &b"one"[..]), ("u2", &b"two"[..])] {
            app.clone()
                .oneshot(upload_request((owner, "user"), "f.txt", bytes))
                .await
                .unwrap();
        }

        let search = |actor: (&str, &str)| {
            Request::builder()
                .method("POST")
                .uri("/api/documents/search")
                .header(auth::ACTOR_ID_HEADER, actor.0)
                .header(auth::ACTOR_ROLE_HEADER, actor.1)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"sortBy":"title","pageSize":10}"#))
                .unwrap()
        };

        let page = json_body(app.clone().oneshot(search(("u1", "user"))).await.unwrap()).await;
        assert_eq!(page["total"], 1);
        let page = json_body(app.oneshot(search(("m1", "manager"))).await.unwrap()).await;
        assert_eq!(page["total"], 2);
    }

    #[tokio::test]
    async fn test_callback_token_of_other_length_is_rejected() {
        let (app, _dir) = setup_test_app(Some("s3cret")).await;
        for token in ["s3cre", "s3cret-and-more", ""] {
            let response = app
                .clone()
                .oneshot(callback_request("any", "text", Some(token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_dashboard_requires_stats_role() {
        let (app, _dir) = setup_test_app(None).await;
        app.clone()
            .oneshot(upload_request(("u1", "user"), "a.txt", b"dashboard"))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(get_as("/api/dashboard/totals", ("u1", "user")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(get_as("/api/dashboard/totals", ("a1", "admin")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let totals = json_body(response).await;
        assert_eq!(totals["totalDocuments"], 1);
        assert_eq!(totals["todayUploads"], 1);
        assert_eq!(totals["totalUsers"], 1);

        let by_department = json_body(
            app.oneshot(get_as(
                "/api/dashboard/documents-by-department",
                ("m1", "manager"),
            ))
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(by_department["Unknown"], 1);
    }
}
