//! Stable error classification shared by every layer.

use serde::{Deserialize, Serialize};

/// The kind of a failure, independent of which layer produced it.
///
/// Outer surfaces pick status codes from this instead of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Referenced job, preset, or backend record does not exist.
    NotFound,
    /// Preset name already taken.
    Conflict,
    /// Operation not valid for the job's current status.
    InvalidState,
    /// Malformed submission.
    BadInput,
    /// Storage not bound or unreachable.
    BackendUnavailable,
    /// Dispatcher queue is full or draining.
    Overloaded,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::BadInput => "bad_input",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::Overloaded => "overloaded",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
