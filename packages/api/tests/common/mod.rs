#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actors::{DispatcherConfig, EncodeFuture, FnEncoder, JobLifecycle, StatusReporter};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use db::MemoryStorage;
use encode_core::Job;
use tower::ServiceExt;

/// An engine whose encoder accepts every job and reports nothing, so jobs
/// stay `queued` after Start.
pub async fn engine() -> JobLifecycle {
    let encoder = FnEncoder::new(
        "noop",
        |_job: Job, _reporter: StatusReporter| -> EncodeFuture { Box::pin(async { Ok(()) }) },
    );
    JobLifecycle::start_with(
        Arc::new(MemoryStorage::new()),
        Arc::new(encoder),
        DispatcherConfig::default().with_poll_interval(Duration::from_millis(5)),
    )
    .await
    .expect("engine starts")
}

pub async fn app() -> Router {
    api::router(engine().await)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send a request and decode the JSON body (`Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub fn mobile() -> serde_json::Value {
    serde_json::json!({
        "name": "mobile",
        "description": "phones",
        "params": {
            "container": "mp4",
            "video": {"codec": "h264", "height": 480, "bitrate": "800000"},
            "audio": {"codec": "aac", "bitrate": "64000"}
        }
    })
}
