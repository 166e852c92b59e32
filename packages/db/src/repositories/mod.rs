//! Repository implementations for SurrealDB operations.

mod job_repo;
mod preset_repo;

pub use job_repo::JobRepository;
pub use preset_repo::PresetRepository;
