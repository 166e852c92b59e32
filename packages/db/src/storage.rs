//! The storage gateway contract shared by every backend.

use async_trait::async_trait;
use encode_core::{ErrorKind, Job, JobId, JobState, JobStatus, Preset};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Storage not initialized - call db::init first")]
    NotInitialized,
    #[error("Storage already initialized")]
    AlreadyInitialized,
    #[error("Connection error: {0}")]
    Connection(#[from] surrealdb::Error),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Job {id} is {actual}, expected {expected}")]
    StatusMismatch {
        id: JobId,
        expected: JobState,
        actual: JobState,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Classify this error for outer layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound(_) => ErrorKind::NotFound,
            DbError::Conflict(_) => ErrorKind::Conflict,
            DbError::StatusMismatch { .. } => ErrorKind::InvalidState,
            DbError::NotInitialized
            | DbError::AlreadyInitialized
            | DbError::Connection(_)
            | DbError::Query(_)
            | DbError::Serialization(_) => ErrorKind::BackendUnavailable,
        }
    }

    pub(crate) fn job_not_found(id: JobId) -> Self {
        DbError::NotFound(format!("Job not found: {}", id))
    }

    pub(crate) fn preset_not_found(name: &str) -> Self {
        DbError::NotFound(format!("Preset not found: {}", name))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Persistence for jobs and presets.
///
/// Every operation is atomic with respect to the single entity it touches.
/// Implementations must report the same [`DbError`] variants for the same
/// situations so the lifecycle engine behaves identically on any backend.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Check that the backend is reachable.
    async fn health(&self) -> Result<(), DbError>;

    /// Persist a new job. Fails with `Conflict` if the id is taken.
    async fn store_job(&self, job: &Job) -> Result<JobId, DbError>;

    async fn retrieve_job(&self, id: JobId) -> Result<Job, DbError>;

    /// All jobs, oldest first.
    async fn get_jobs(&self) -> Result<Vec<Job>, DbError>;

    /// Compare-and-set the job status.
    ///
    /// Applies `status` only when the stored status is `expected`; otherwise
    /// fails with `StatusMismatch` carrying the actual status. `progress`,
    /// when given, is written in the same step.
    async fn update_job_status(
        &self,
        id: JobId,
        expected: JobState,
        status: JobStatus,
        progress: Option<u8>,
    ) -> Result<Job, DbError>;

    /// Record encoder progress. Only applies while the job is `processing`.
    async fn update_job_progress(&self, id: JobId, percent: u8) -> Result<Job, DbError>;

    /// Persist a new preset. Fails with `Conflict` if the name is taken.
    async fn store_preset(&self, preset: &Preset) -> Result<String, DbError>;

    async fn retrieve_preset(&self, name: &str) -> Result<Preset, DbError>;

    /// Replace the description and params of an existing preset.
    async fn update_preset(&self, name: &str, preset: &Preset) -> Result<Preset, DbError>;

    async fn delete_preset(&self, name: &str) -> Result<(), DbError>;

    /// All presets, ordered by name.
    async fn get_presets(&self) -> Result<Vec<Preset>, DbError>;
}
