//! Preset routes.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use encode_core::Preset;

use crate::AppState;
use crate::error::ApiError;

/// `POST /presets`
pub async fn create_preset(
    State(state): State<AppState>,
    payload: Result<Json<Preset>, JsonRejection>,
) -> Result<(StatusCode, Json<Preset>), ApiError> {
    let Json(preset) = payload?;
    let created = state.engine.create_preset(preset).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /presets`
pub async fn list_presets(State(state): State<AppState>) -> Result<Json<Vec<Preset>>, ApiError> {
    Ok(Json(state.engine.list_presets().await?))
}

/// `GET /presets/{name}`
pub async fn get_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Preset>, ApiError> {
    Ok(Json(state.engine.get_preset(&name).await?))
}

/// `PUT /presets/{name}`
pub async fn update_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<Preset>, JsonRejection>,
) -> Result<Json<Preset>, ApiError> {
    let Json(preset) = payload?;
    Ok(Json(state.engine.update_preset(&name, preset).await?))
}

/// `DELETE /presets/{name}`
pub async fn delete_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_preset(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
