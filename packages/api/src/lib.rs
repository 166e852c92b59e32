//! HTTP API for the encoding job service.
//!
//! This crate maps the lifecycle engine onto an axum router:
//! - Preset management (create, list, get, update, delete)
//! - Job management (create, list, get, start)
//! - Health check against the bound storage

mod config;
mod error;
mod init;
mod jobs;
mod presets;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::json;

pub use config::{ConfigError, ServiceConfig};
pub use error::{ApiError, status_for};
pub use init::{init_service, init_service_with};

// Re-export core types for convenience
pub use actors::JobLifecycle;
pub use encode_core::{ErrorKind, Job, JobEvent, JobId, JobInput, JobState, JobStatus, Preset};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: JobLifecycle,
}

/// Build the router over `engine`.
pub fn router(engine: JobLifecycle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/start", post(jobs::start_job))
        .route(
            "/presets",
            post(presets::create_preset).get(presets::list_presets),
        )
        .route(
            "/presets/{name}",
            get(presets::get_preset)
                .put(presets::update_preset)
                .delete(presets::delete_preset),
        )
        .with_state(AppState { engine })
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> Response {
    let storage = state.engine.storage();
    match storage.health().await {
        Ok(()) => Json(json!({
            "status": "ok",
            "backend": storage.backend(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "backend": storage.backend(),
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
