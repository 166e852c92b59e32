//! Message types for actor communication, and the engine's error type.

use db::DbError;
use encode_core::{ErrorKind, Job, JobId, JobState};
use ractor::RpcReplyPort;
use serde::Serialize;

/// Messages for the DispatcherActor.
#[derive(Debug)]
pub enum DispatcherMessage {
    /// Claim a pending slot ahead of a Start. Replies `false` when the
    /// pending queue is full or the dispatcher is draining.
    Reserve { reply: RpcReplyPort<bool> },

    /// Give back a slot claimed by a Start that lost its status race.
    Release,

    /// Hand a queued job over for execution. Consumes one reservation.
    Dispatch { job: Box<Job> },

    /// Request the next job for a worker.
    RequestJob {
        worker_id: String,
        reply: RpcReplyPort<Option<Job>>,
    },

    /// A worker's encoder invocation returned.
    InvocationDone { job_id: JobId, worker_id: String },

    /// Stop accepting reservations and reply once nothing is pending,
    /// reserved or running.
    Drain { reply: RpcReplyPort<()> },

    /// Get dispatcher stats.
    GetStats { reply: RpcReplyPort<DispatcherStats> },

    /// Stop the workers and the dispatcher.
    Shutdown,
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Run the encoder for a job.
    ProcessJob { job: Box<Job> },

    /// The encode for `job_id` has returned.
    EncodeDone { job_id: JobId },

    /// Shutdown the worker.
    Shutdown,

    /// Poll tick.
    Heartbeat,
}

/// Point-in-time view of the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub pending: usize,
    pub reserved: usize,
    pub running: usize,
    pub max_pending: usize,
    pub draining: bool,
}

/// Errors returned by the lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {id} is {actual}, expected {expected}")]
    InvalidState {
        id: JobId,
        expected: JobState,
        actual: JobState,
    },

    #[error("Invalid input: {0}")]
    BadInput(String),

    #[error("Dispatcher overloaded: {0}")]
    Overloaded(String),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::JobNotFound(_) => ErrorKind::NotFound,
            LifecycleError::InvalidState { .. } => ErrorKind::InvalidState,
            LifecycleError::BadInput(_) => ErrorKind::BadInput,
            LifecycleError::Overloaded(_) => ErrorKind::Overloaded,
            LifecycleError::Storage(e) => e.kind(),
        }
    }
}
