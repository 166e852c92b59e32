//! In-process storage backed by sharded concurrent maps.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use encode_core::{Job, JobId, JobState, JobStatus, Preset};

use crate::storage::{DbError, Storage};

/// Map-backed storage.
///
/// Each job and preset lives under its own shard lock, so operations on
/// different entities never wait on each other.
#[derive(Default)]
pub struct MemoryStorage {
    jobs: DashMap<JobId, Job>,
    presets: DashMap<String, Preset>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn store_job(&self, job: &Job) -> Result<JobId, DbError> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Err(DbError::Conflict(format!("Job already exists: {}", job.id))),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(job.id)
            }
        }
    }

    async fn retrieve_job(&self, id: JobId) -> Result<Job, DbError> {
        self.jobs
            .get(&id)
            .map(|job| job.value().clone())
            .ok_or_else(|| DbError::job_not_found(id))
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, DbError> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    async fn update_job_status(
        &self,
        id: JobId,
        expected: JobState,
        status: JobStatus,
        progress: Option<u8>,
    ) -> Result<Job, DbError> {
        let mut job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| DbError::job_not_found(id))?;

        let actual = job.state();
        if actual != expected {
            return Err(DbError::StatusMismatch {
                id,
                expected,
                actual,
            });
        }

        job.status = status;
        if let Some(progress) = progress {
            job.progress = progress;
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn update_job_progress(&self, id: JobId, percent: u8) -> Result<Job, DbError> {
        let mut job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| DbError::job_not_found(id))?;

        let actual = job.state();
        if actual != JobState::Processing {
            return Err(DbError::StatusMismatch {
                id,
                expected: JobState::Processing,
                actual,
            });
        }

        job.progress = percent;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn store_preset(&self, preset: &Preset) -> Result<String, DbError> {
        match self.presets.entry(preset.name.clone()) {
            Entry::Occupied(_) => Err(DbError::Conflict(format!(
                "Preset already exists: {}",
                preset.name
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let mut stored = preset.clone();
                stored.created_at = now;
                stored.updated_at = now;
                slot.insert(stored);
                Ok(preset.name.clone())
            }
        }
    }

    async fn retrieve_preset(&self, name: &str) -> Result<Preset, DbError> {
        self.presets
            .get(name)
            .map(|preset| preset.value().clone())
            .ok_or_else(|| DbError::preset_not_found(name))
    }

    async fn update_preset(&self, name: &str, preset: &Preset) -> Result<Preset, DbError> {
        let mut stored = self
            .presets
            .get_mut(name)
            .ok_or_else(|| DbError::preset_not_found(name))?;

        stored.description = preset.description.clone();
        stored.params = preset.params.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_preset(&self, name: &str) -> Result<(), DbError> {
        self.presets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DbError::preset_not_found(name))
    }

    async fn get_presets(&self) -> Result<Vec<Preset>, DbError> {
        let mut presets: Vec<Preset> = self
            .presets
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        presets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(presets)
    }
}
