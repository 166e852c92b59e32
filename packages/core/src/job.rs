//! Job domain types for encoding work items.

use std::sync::{LazyLock, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

use crate::Preset;

/// Process-wide generator so ids created within the same millisecond
/// still sort in creation order.
static ID_GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        let next = ID_GENERATOR
            .lock()
            .ok()
            .and_then(|mut generator| generator.generate().ok());
        // The monotonic generator only fails when the random part overflows
        // inside one millisecond; a fresh random ULID is still unique.
        Self(next.unwrap_or_else(Ulid::new))
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status tag without payload, used for compare-and-set transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Created,
    Queued,
    Processing,
    Finished,
    Error,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Finished => "finished",
            JobState::Error => "error",
        }
    }

    /// Whether the forward-only graph has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Created, JobState::Queued)
                | (JobState::Queued, JobState::Processing)
                | (JobState::Processing, JobState::Finished)
                | (JobState::Processing, JobState::Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Error)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a job in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    /// Job has been submitted but not started.
    #[default]
    Created,
    /// Start was accepted; waiting for the encoder to pick it up.
    Queued { queued_at: DateTime<Utc> },
    /// The encoder reported that it began working on the job.
    Processing {
        queued_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
    },
    /// The encoder reported success.
    Finished {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// The encoder reported failure.
    Error {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        cause: String,
    },
}

impl JobStatus {
    /// The payload-free tag of this status.
    pub fn state(&self) -> JobState {
        match self {
            JobStatus::Created => JobState::Created,
            JobStatus::Queued { .. } => JobState::Queued,
            JobStatus::Processing { .. } => JobState::Processing,
            JobStatus::Finished { .. } => JobState::Finished,
            JobStatus::Error { .. } => JobState::Error,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        self.state().as_str()
    }

    /// Build the `queued` status from `created`.
    pub fn queued(now: DateTime<Utc>) -> Self {
        JobStatus::Queued { queued_at: now }
    }

    /// Build the `processing` status that follows this one, if allowed.
    pub fn processing(&self, now: DateTime<Utc>) -> Option<Self> {
        match self {
            JobStatus::Queued { queued_at } => Some(JobStatus::Processing {
                queued_at: *queued_at,
                started_at: now,
            }),
            _ => None,
        }
    }

    /// Build the `finished` status that follows this one, if allowed.
    pub fn finished(&self, now: DateTime<Utc>) -> Option<Self> {
        match self {
            JobStatus::Processing { started_at, .. } => Some(JobStatus::Finished {
                started_at: *started_at,
                finished_at: now,
            }),
            _ => None,
        }
    }

    /// Build the `error` status that follows this one, if allowed.
    pub fn failed(&self, now: DateTime<Utc>, cause: impl Into<String>) -> Option<Self> {
        match self {
            JobStatus::Processing { started_at, .. } => Some(JobStatus::Error {
                started_at: *started_at,
                failed_at: now,
                cause: cause.into(),
            }),
            _ => None,
        }
    }
}

/// Caller-supplied fields for submitting a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    pub source: String,
    pub destination: String,
    /// Name of the preset to snapshot into the job.
    pub preset: String,
}

impl JobInput {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        preset: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            preset: preset.into(),
        }
    }

    /// Reject empty locators and preset names.
    pub fn validate(&self) -> Result<(), String> {
        if self.source.trim().is_empty() {
            return Err("source must not be empty".into());
        }
        if self.destination.trim().is_empty() {
            return Err("destination must not be empty".into());
        }
        if self.preset.trim().is_empty() {
            return Err("preset must not be empty".into());
        }
        Ok(())
    }
}

/// An encoding job: one source, one destination, one preset snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Input media locator.
    pub source: String,
    /// Output media locator.
    pub destination: String,
    /// Copy of the preset taken when the job was created.
    pub preset: Preset,
    /// Current status.
    #[serde(flatten)]
    pub status: JobStatus,
    /// Encoder-reported completion percentage.
    #[serde(default)]
    pub progress: u8,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the `created` state from validated input and a
    /// resolved preset.
    pub fn new(input: JobInput, preset: Preset) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            source: input.source,
            destination: input.destination,
            preset,
            status: JobStatus::Created,
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> JobState {
        self.status.state()
    }
}
