//! Core domain types for the encoding job service.
//!
//! This crate contains shared types used across all packages:
//! - Preset for named encoding configurations
//! - Job, JobStatus and JobState for encoding work items
//! - Events for real-time updates
//! - ErrorKind, the stable failure classification

mod error;
mod events;
mod job;
mod preset;

pub use error::ErrorKind;
pub use events::JobEvent;
pub use job::{Job, JobId, JobInput, JobState, JobStatus};
pub use preset::{MAX_PRESET_NAME_LEN, Preset, validate_preset_name};
