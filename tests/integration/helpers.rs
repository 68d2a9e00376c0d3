//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use broker_api::{AppState, build_app};
use broker_core::config::AppConfig;
use broker_database::StoreManager;
use broker_storage::LogStoreManager;
use broker_storage::providers::MemoryLogStore;

/// Multipart boundary used by [`TestApp::upload`].
const BOUNDARY: &str = "broker-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for direct scheduler access
    pub state: AppState,
    /// Logfile blobs behind the app
    pub blobs: Arc<MemoryLogStore>,
}

impl TestApp {
    /// Create a test application over in-memory backends
    pub fn new() -> Self {
        let blobs = Arc::new(MemoryLogStore::new());
        let state = AppState::new(
            AppConfig::default(),
            StoreManager::memory(),
            LogStoreManager::from_provider(blobs.clone()),
        );
        let router = build_app(state.clone());
        Self {
            router,
            state,
            blobs,
        }
    }

    /// Submit a job and return its identifier
    pub async fn submit(&self, submitter: &str, command: &str) -> i64 {
        let response = self
            .request(
                "POST",
                "/jobs",
                Some(json!({
                    "submitter": submitter,
                    "description": format!("{command} for {submitter}"),
                    "command": command,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["identifier"]
            .as_i64()
            .expect("identifier in submit response")
    }

    /// Report a status for a job through the runner endpoint
    pub async fn update(&self, identifier: i64, status: Value) -> TestResponse {
        self.request(
            "PUT",
            "/runners/update-job",
            Some(json!({ "identifier": identifier, "status": status })),
        )
        .await
    }

    /// Make a JSON request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Upload `content` as a multipart field named `field`
    pub async fn upload(&self, path: &str, field: &str, content: &[u8]) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"run.log\"\r\nContent-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let raw = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body: Value = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            raw,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: http::HeaderMap,
    /// Raw body bytes
    pub raw: Bytes,
    /// Parsed JSON body (`Null` when the body is not JSON)
    pub body: Value,
}

impl TestResponse {
    /// Statuses of the job's events, oldest first
    pub fn event_statuses(&self) -> Vec<String> {
        self.body["events"]
            .as_array()
            .map(|events| {
                events
                    .iter()
                    .filter_map(|e| e["status"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
