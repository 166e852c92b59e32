//! Job repository for SurrealDB persistence.

use chrono::{DateTime, Utc};
use encode_core::{Job, JobId, JobState, JobStatus};
use serde::{Deserialize, Serialize};

use super::preset_repo::PresetRecord;
use crate::{Database, DbError};

/// Attempts at a conditional update that keeps hitting transaction conflicts
/// while the job is still in the expected state.
const CONFLICT_ATTEMPTS: usize = 3;

/// Repository for job persistence operations.
pub struct JobRepository;

/// Stored shape of a job.
///
/// The job id lives in the record key, and the status stays nested so a
/// status change replaces the whole object instead of leaving stale
/// timestamp fields behind.
#[derive(Debug, Serialize, Deserialize)]
struct JobRecord {
    job_id: JobId,
    source: String,
    destination: String,
    preset: PresetRecord,
    status: JobStatus,
    #[serde(default)]
    progress: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn from_job(job: &Job) -> Result<Self, DbError> {
        Ok(Self {
            job_id: job.id,
            source: job.source.clone(),
            destination: job.destination.clone(),
            preset: PresetRecord::from_preset(&job.preset)?,
            status: job.status.clone(),
            progress: job.progress,
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }

    fn into_job(self) -> Result<Job, DbError> {
        Ok(Job {
            id: self.job_id,
            source: self.source,
            destination: self.destination,
            preset: self.preset.into_preset()?,
            status: self.status,
            progress: self.progress,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl JobRepository {
    /// Create a new job in the database.
    pub async fn create(db: &Database, job: &Job) -> Result<Job, DbError> {
        let created: Result<Option<JobRecord>, _> = db
            .create(("job", job.id.to_string()))
            .content(JobRecord::from_job(job)?)
            .await;

        match created {
            Ok(record) => record
                .ok_or_else(|| DbError::Query("Failed to create job".into()))?
                .into_job(),
            // A failed CREATE on an existing key is a duplicate id.
            Err(e) => match Self::get(db, job.id).await {
                Ok(_) => Err(DbError::Conflict(format!("Job already exists: {}", job.id))),
                Err(_) => Err(e.into()),
            },
        }
    }

    /// Get a job by ID.
    pub async fn get(db: &Database, id: JobId) -> Result<Job, DbError> {
        let record: Option<JobRecord> = db.select(("job", id.to_string())).await?;

        record
            .ok_or_else(|| DbError::job_not_found(id))?
            .into_job()
    }

    /// List all jobs, oldest first.
    pub async fn list(db: &Database) -> Result<Vec<Job>, DbError> {
        let mut response = db
            .query("SELECT * FROM job ORDER BY job_id ASC")
            .await?;

        let records: Vec<JobRecord> = response.take(0)?;

        records.into_iter().map(JobRecord::into_job).collect()
    }

    /// Replace a job's status if it currently has the `expected` status.
    ///
    /// The condition and the write happen in one UPDATE statement. Callers
    /// that may race on the same job serialize through
    /// [`SurrealStorage`](crate::SurrealStorage), which holds a per-job lock.
    pub async fn update_status(
        db: &Database,
        id: JobId,
        expected: JobState,
        status: &JobStatus,
        progress: Option<u8>,
    ) -> Result<Job, DbError> {
        let set_progress = if progress.is_some() {
            ", progress = $progress"
        } else {
            ""
        };
        let query = format!(
            "UPDATE type::thing('job', $id) SET status = $status{}, updated_at = $now \
             WHERE status.status = $expected RETURN AFTER",
            set_progress
        );
        let status = serde_json::to_value(status)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = async {
                let mut result = db
                    .query(query.clone())
                    .bind(("id", id.to_string()))
                    .bind(("status", status.clone()))
                    .bind(("progress", progress.unwrap_or_default()))
                    .bind(("now", serde_json::to_value(Utc::now())?))
                    .bind(("expected", expected.as_str()))
                    .await?
                    .check()?;
                let records: Vec<JobRecord> = result.take(0)?;
                Ok::<_, DbError>(records)
            }
            .await;

            if let Some(job) = Self::settle(db, id, expected, result, attempt).await? {
                return Ok(job);
            }
        }
    }

    /// Set progress on a job that is currently processing.
    pub async fn update_progress(db: &Database, id: JobId, percent: u8) -> Result<Job, DbError> {
        let expected = JobState::Processing;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = async {
                let mut result = db
                    .query(
                        "UPDATE type::thing('job', $id) SET progress = $progress, updated_at = $now \
                         WHERE status.status = $expected RETURN AFTER",
                    )
                    .bind(("id", id.to_string()))
                    .bind(("progress", percent))
                    .bind(("now", serde_json::to_value(Utc::now())?))
                    .bind(("expected", expected.as_str()))
                    .await?
                    .check()?;
                let records: Vec<JobRecord> = result.take(0)?;
                Ok::<_, DbError>(records)
            }
            .await;

            if let Some(job) = Self::settle(db, id, expected, result, attempt).await? {
                return Ok(job);
            }
        }
    }

    /// Turn the outcome of a conditional update into a job or an error.
    ///
    /// `Ok(None)` asks the caller to run the update again: the write lost a
    /// transaction conflict but the job is still in the `expected` state.
    async fn settle(
        db: &Database,
        id: JobId,
        expected: JobState,
        result: Result<Vec<JobRecord>, DbError>,
        attempt: usize,
    ) -> Result<Option<Job>, DbError> {
        match result {
            Ok(records) => match records.into_iter().next() {
                Some(record) => record.into_job().map(Some),
                None => Err(Self::mismatch(db, id, expected).await),
            },
            Err(e) if is_conflict(&e) => match Self::mismatch(db, id, expected).await {
                // Someone else moved the job first.
                mismatch @ DbError::StatusMismatch { .. } => Err(mismatch),
                _ if attempt < CONFLICT_ATTEMPTS => {
                    tracing::debug!(job_id = %id, attempt, "Retrying update after conflict");
                    Ok(None)
                }
                _ => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Explain why a conditional update matched nothing.
    async fn mismatch(db: &Database, id: JobId, expected: JobState) -> DbError {
        match Self::get(db, id).await {
            Ok(job) if job.state() != expected => DbError::StatusMismatch {
                id,
                expected,
                actual: job.state(),
            },
            Ok(_) => DbError::Query(format!("Update of job {} matched no record", id)),
            Err(e) => e,
        }
    }
}

/// Whether a query failed because its transaction lost a read/write conflict.
fn is_conflict(err: &DbError) -> bool {
    match err {
        DbError::Connection(e) => e.to_string().contains("conflict"),
        DbError::Query(msg) => msg.contains("conflict"),
        _ => false,
    }
}
