//! SurrealDB-backed storage.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use encode_core::{Job, JobId, JobState, JobStatus, Preset};
use tokio::sync::Mutex;

use crate::repositories::{JobRepository, PresetRepository};
use crate::storage::{DbError, Storage};
use crate::Database;

/// Storage on a SurrealDB connection.
///
/// Works against any endpoint the `any` engine accepts: `mem://` in tests,
/// `rocksdb://` on a single host, `ws://` for a shared server.
///
/// Status writes to one job are serialized through a per-job lock, so racing
/// compare-and-set calls from this process see each other's result instead
/// of colliding inside the datastore.
#[derive(Clone)]
pub struct SurrealStorage {
    db: Database,
    job_locks: Arc<DashMap<JobId, Arc<Mutex<()>>>>,
}

impl SurrealStorage {
    /// Wrap an already connected and schema-initialized database.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            job_locks: Arc::new(DashMap::new()),
        }
    }

    fn job_lock(&self, id: JobId) -> Arc<Mutex<()>> {
        self.job_locks.entry(id).or_default().clone()
    }

    /// Drop the lock entry once no other caller holds it.
    fn release_job_lock(&self, id: JobId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.job_locks
            .remove_if(&id, |_, held| Arc::strong_count(held) == 1);
    }
}

#[async_trait]
impl Storage for SurrealStorage {
    fn backend(&self) -> &'static str {
        "surrealdb"
    }

    async fn health(&self) -> Result<(), DbError> {
        self.db.health().await?;
        Ok(())
    }

    async fn store_job(&self, job: &Job) -> Result<JobId, DbError> {
        JobRepository::create(&self.db, job).await.map(|job| job.id)
    }

    async fn retrieve_job(&self, id: JobId) -> Result<Job, DbError> {
        JobRepository::get(&self.db, id).await
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, DbError> {
        JobRepository::list(&self.db).await
    }

    async fn update_job_status(
        &self,
        id: JobId,
        expected: JobState,
        status: JobStatus,
        progress: Option<u8>,
    ) -> Result<Job, DbError> {
        let lock = self.job_lock(id);
        let result = {
            let _guard = lock.lock().await;
            JobRepository::update_status(&self.db, id, expected, &status, progress).await
        };
        self.release_job_lock(id, lock);
        result
    }

    async fn update_job_progress(&self, id: JobId, percent: u8) -> Result<Job, DbError> {
        let lock = self.job_lock(id);
        let result = {
            let _guard = lock.lock().await;
            JobRepository::update_progress(&self.db, id, percent).await
        };
        self.release_job_lock(id, lock);
        result
    }

    async fn store_preset(&self, preset: &Preset) -> Result<String, DbError> {
        PresetRepository::create(&self.db, preset)
            .await
            .map(|preset| preset.name)
    }

    async fn retrieve_preset(&self, name: &str) -> Result<Preset, DbError> {
        PresetRepository::get(&self.db, name).await
    }

    async fn update_preset(&self, name: &str, preset: &Preset) -> Result<Preset, DbError> {
        PresetRepository::update(&self.db, name, preset).await
    }

    async fn delete_preset(&self, name: &str) -> Result<(), DbError> {
        PresetRepository::delete(&self.db, name).await
    }

    async fn get_presets(&self) -> Result<Vec<Preset>, DbError> {
        PresetRepository::list(&self.db).await
    }
}
