mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{empty_request, json_request, send};

#[tokio::test]
async fn health_reports_backend() {
    let app = common::app().await;
    let (status, body) = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn preset_crud() {
    let app = common::app().await;

    let (status, created) = send(&app, json_request("POST", "/presets", common::mobile())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "mobile");

    let (status, body) = send(&app, json_request("POST", "/presets", common::mobile())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, fetched) = send(&app, empty_request("GET", "/presets/mobile")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["params"], common::mobile()["params"]);

    let mut renamed = common::mobile();
    renamed["name"] = json!("tablet");
    let (status, body) = send(&app, json_request("PUT", "/presets/mobile", renamed)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_input");

    let mut changed = common::mobile();
    changed["params"] = json!({"container": "webm"});
    let (status, updated) = send(&app, json_request("PUT", "/presets/mobile", changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["params"]["container"], "webm");

    let (status, list) = send(&app, empty_request("GET", "/presets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, body) = send(&app, empty_request("DELETE", "/presets/mobile")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = send(&app, empty_request("DELETE", "/presets/mobile")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(&app, empty_request("GET", "/presets/mobile")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_preset_name_is_bad_input() {
    let app = common::app().await;
    let mut preset = common::mobile();
    preset["name"] = json!("has space");

    let (status, body) = send(&app, json_request("POST", "/presets", preset)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_input");
}

#[tokio::test]
async fn job_lifecycle_over_http() {
    let app = common::app().await;
    send(&app, json_request("POST", "/presets", common::mobile())).await;

    let input = json!({"source": "a.mp4", "destination": "b.mp4", "preset": "mobile"});
    let (status, job) = send(&app, json_request("POST", "/jobs", input)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(job["status"], "created");
    assert_eq!(job["preset"]["params"], common::mobile()["params"]);
    let id = job["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, empty_request("GET", &format!("/jobs/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id.as_str());

    let (status, started) =
        send(&app, empty_request("POST", &format!("/jobs/{}/start", id))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(started["status"], "queued");
    assert!(started["queued_at"].is_string());

    let (status, body) = send(&app, empty_request("POST", &format!("/jobs/{}/start", id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_state");

    let (status, list) = send(&app, empty_request("GET", "/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["id"], id.as_str());
}

#[tokio::test]
async fn job_errors_map_to_statuses() {
    let app = common::app().await;

    let input = json!({"source": "a.mp4", "destination": "b.mp4", "preset": "missing"});
    let (status, body) = send(&app, json_request("POST", "/jobs", input)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let input = json!({"source": "", "destination": "b.mp4", "preset": "missing"});
    let (status, body) = send(&app, json_request("POST", "/jobs", input)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_input");

    let (status, body) = send(&app, empty_request("GET", "/jobs/not-a-job")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(&app, empty_request("POST", "/jobs/not-a-job/start")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send(&app, empty_request("GET", "/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn malformed_bodies_are_bad_input() {
    let app = common::app().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/jobs")
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_input");

    let (status, body) = send(
        &app,
        json_request("POST", "/presets", json!({"description": "no name"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_input");
}
