//! Job routes.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use encode_core::{Job, JobInput};

use crate::AppState;
use crate::error::ApiError;

/// `POST /jobs`
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<JobInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let Json(input) = payload?;
    let job = state.engine.submit(input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// `GET /jobs`
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(state.engine.list().await?))
}

/// `GET /jobs/{id}`
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.engine.get(&id).await?))
}

/// `POST /jobs/{id}/start`
///
/// Answers `202 Accepted` with the queued job; the encode runs in the
/// background.
pub async fn start_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let job = state.engine.start(&id).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}
