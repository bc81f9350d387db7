#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

use vigil_ingest::IngestService;
use vigil_notify::StubNotifier;
use vigil_processor::ProcessorService;
use vigil_queue::memory::MemoryQueue;
use vigil_server::app;
use vigil_server::config::ServerConfig;
use vigil_server::state::AppState;
use vigil_store::memory::{
    MemoryAlertRepository, MemoryGroupingRuleRepository, MemoryStateStore, MemoryTenantRepository,
};

pub struct TestContext {
    pub app: axum::Router,
    pub cancel: CancellationToken,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Wires the whole pipeline (HTTP -> queue -> processor) over in-memory
/// backends, with the processor consuming in the background.
pub async fn build_test_context() -> TestContext {
    vigil_common::id::init(1, 1);

    let queue = Arc::new(MemoryQueue::new(4, 64));
    let state_store = Arc::new(MemoryStateStore::new());
    let alerts = Arc::new(MemoryAlertRepository::new());
    let tenants = Arc::new(MemoryTenantRepository::new());
    let rules = Arc::new(MemoryGroupingRuleRepository::new());
    let notifier = Arc::new(StubNotifier::new());

    let ingest = Arc::new(IngestService::new(
        queue.clone(),
        tenants.clone(),
        rules.clone(),
    ));
    let processor = Arc::new(ProcessorService::new(
        queue.clone(),
        state_store.clone(),
        alerts.clone(),
        tenants.clone(),
        rules.clone(),
        notifier,
    ));

    let cancel = CancellationToken::new();
    tokio::spawn(processor.run(cancel.clone()));

    let state = AppState {
        ingest,
        alerts,
        tenants,
        rules,
        config: Arc::new(ServerConfig::default()),
        start_time: Utc::now(),
    };
    let app = app::build_http_app(state);

    TestContext { app, cancel }
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder.body(Body::from(req_body)).expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "expected success envelope: {body}");
    assert_eq!(body["err_msg"], "success");
}

pub fn assert_err_envelope(body: &Value, err_code: i64) {
    assert_eq!(body["err_code"], err_code, "unexpected envelope: {body}");
}

/// Polls `check` against the API until it returns true or the deadline hits.
pub async fn wait_until<F, Fut>(mut check: F, what: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
