//! Common test utilities for in-process API testing with mocks.
//!
//! Builds the real router over a `WorkflowOrchestrator` whose providers and
//! assembler are the core crate's mocks, rooted in a temp directory.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use keyreel_core::{
    testing::{MockAssembler, MockGenerationProvider, MockImageGenerator},
    Config, InMemorySessionRegistry, WorkflowOrchestrator,
};
use keyreel_server::state::AppState;

/// Re-export fixtures for test convenience
pub use keyreel_core::testing::fixtures;

const BOUNDARY: &str = "keyreel-test-boundary";

/// In-process server with controllable mocks.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().await;
/// let response = fixture.post("/api/v1/sessions").await;
/// assert_eq!(response.status, StatusCode::CREATED);
/// ```
pub struct TestFixture {
    pub router: Router,
    pub config: Config,
    pub provider: Arc<MockGenerationProvider>,
    pub images: Arc<MockImageGenerator>,
    pub assembler: Arc<MockAssembler>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// One video stage; the provider completes every job.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Fixture whose config is adjusted by `configure` before the router is built.
    pub async fn with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = fixtures::test_config(&temp_dir.path().join("static"));
        config.plan = fixtures::video_plan(1);
        configure(&mut config);
        config
            .storage
            .ensure_dirs()
            .expect("Failed to create storage dirs");

        let provider = Arc::new(MockGenerationProvider::new());
        provider.complete_all().await;
        let images = Arc::new(MockImageGenerator::new());
        let assembler = Arc::new(MockAssembler::new());

        let orchestrator = WorkflowOrchestrator::new(
            &config,
            Arc::new(InMemorySessionRegistry::new()),
            provider.clone(),
            images.clone(),
            assembler.clone(),
        );
        let state = Arc::new(AppState::new(config.clone(), orchestrator));
        let router = keyreel_server::api::create_router(state);

        Self {
            router,
            config,
            provider,
            images,
            assembler,
            temp_dir,
        }
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path), Body::empty())
            .await
    }

    /// Send a body-less POST request.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("POST").uri(path), Body::empty())
            .await
    }

    /// POST a multipart form with a single file field.
    pub async fn post_file(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = BOUNDARY,
                f = field,
                n = file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        self.send(builder, Body::from(body)).await
    }

    /// GET a path and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Files currently in the uploads directory.
    pub fn stored_uploads(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(&self.config.storage.uploads_dir)
            .expect("Failed to read uploads dir")
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    /// Poll a session until it leaves PROCESSING.
    pub async fn wait_for_session(&self, id: &str) -> Value {
        for _ in 0..200 {
            let response = self.get(&format!("/api/v1/sessions/{}", id)).await;
            if response.body["status"] != "PROCESSING" {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {} never left PROCESSING", id);
    }

    async fn send(&self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let request = builder.body(body).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
