//! Error responses for the HTTP surface.

use actors::LifecycleError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use db::DbError;
use encode_core::ErrorKind;
use serde::Serialize;

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Storage(#[from] DbError),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Lifecycle(e) => e.kind(),
            ApiError::Storage(e) => e.kind(),
            ApiError::MalformedBody(_) => ErrorKind::BadInput,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

/// Map an error kind to its HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::BackendUnavailable | ErrorKind::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: ErrorKind,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(kind = %kind, "{}", self);
        } else {
            tracing::debug!(kind = %kind, "{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            kind,
        });
        (status, body).into_response()
    }
}
