//! Event types for real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Job, JobId, JobState, Preset};

/// Events emitted by the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    // Preset events
    /// A preset was stored.
    PresetCreated {
        preset: Preset,
        timestamp: DateTime<Utc>,
    },
    /// A preset's configuration was replaced.
    PresetUpdated {
        preset: Preset,
        timestamp: DateTime<Utc>,
    },
    /// A preset was deleted.
    PresetDeleted {
        name: String,
        timestamp: DateTime<Utc>,
    },

    // Job events
    /// A new job was submitted.
    JobCreated { job: Job, timestamp: DateTime<Utc> },
    /// A job moved along the status graph.
    JobStatusChanged {
        job_id: JobId,
        old_status: JobState,
        new_status: JobState,
        timestamp: DateTime<Utc>,
    },
    /// The encoder reported progress.
    JobProgress {
        job_id: JobId,
        percent: u8,
        timestamp: DateTime<Utc>,
    },
    /// An encoder callback did not match the job's status and was dropped.
    CallbackIgnored {
        job_id: JobId,
        expected: JobState,
        actual: Option<JobState>,
        timestamp: DateTime<Utc>,
    },
}
