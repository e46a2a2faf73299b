//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use dispatcher::{DispatchOptions, Dispatcher};
use http_api::{router, AppState};
use http_body_util::BodyExt;
use jobs::{EventLog, JobStore};
use pane::FakePane;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

pub const TOKEN: &str = "test-token";
pub const TARGET: &str = "claude:0.0";

/// A fully wired router over a [`FakePane`] and a temporary job store.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub pane: Arc<FakePane>,
    pub store: JobStore,
    pub app: Router,
}

/// Status, content type and body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("body is not JSON ({}): {}", e, self.body))
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_pane(FakePane::new(TARGET))
    }

    pub fn with_pane(pane: FakePane) -> Self {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let pane = Arc::new(pane);
        let store = JobStore::open(temp_dir.path().join("state")).expect("Failed to open store");
        let events = EventLog::open(temp_dir.path().join("logs").join("events.log"))
            .expect("Failed to open event log");
        let options = DispatchOptions {
            capture_delay: Duration::ZERO,
            ..DispatchOptions::default()
        };
        let dispatcher = Dispatcher::new(pane.clone(), store.clone(), Arc::new(events), options);
        let app = router(AppState::new(Arc::new(dispatcher), TOKEN, 400));

        Self {
            temp_dir,
            pane,
            store,
            app,
        }
    }

    /// Send one request through the router. `auth` is the raw
    /// `Authorization` header value, if any.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<String>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(&bearer()), None).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(&bearer()), Some(body.to_string()))
            .await
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}
