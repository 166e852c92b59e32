//! The job lifecycle engine.
//!
//! [`JobLifecycle`] validates submissions, persists jobs and presets through
//! the [`Storage`] gateway, and drives `created -> queued` on Start before
//! handing the job to the dispatcher. Everything after that is reported by
//! the encoder through its [`StatusReporter`].
//!
//! Every status change is a compare-and-set in the store, so concurrent
//! Start calls and late or duplicate callbacks resolve to exactly one
//! winner without any lock held by the engine.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use db::{DbError, Storage};
use encode_core::{Job, JobEvent, JobId, JobInput, JobState, JobStatus, Preset};
use ractor::{Actor, ActorRef};
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::dispatcher::{DispatcherActor, DispatcherArgs, DispatcherConfig};
use crate::encoder::Encoder;
use crate::messages::{DispatcherMessage, DispatcherStats, LifecycleError};

const EVENT_CAPACITY: usize = 1024;
const DISPATCHER_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether an encoder callback changed the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Applied,
    /// The job was unknown or not in the callback's source state.
    Ignored,
}

/// Shared by the engine handle and every reporter.
struct Core {
    storage: Arc<dyn Storage>,
    events: broadcast::Sender<JobEvent>,
}

impl Core {
    fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn ignored(&self, id: JobId, expected: JobState, actual: Option<JobState>) -> CallbackOutcome {
        tracing::warn!(
            job_id = %id,
            expected = %expected,
            actual = actual.map(JobState::as_str).unwrap_or("missing"),
            "Ignoring encoder callback"
        );
        self.emit(JobEvent::CallbackIgnored {
            job_id: id,
            expected,
            actual,
            timestamp: Utc::now(),
        });
        CallbackOutcome::Ignored
    }

    /// Move a job from `expected` to the status built by `next`.
    async fn advance<F>(
        &self,
        id: JobId,
        expected: JobState,
        next: F,
        progress: Option<u8>,
    ) -> Result<CallbackOutcome, LifecycleError>
    where
        F: FnOnce(&JobStatus) -> Option<JobStatus>,
    {
        let job = match self.storage.retrieve_job(id).await {
            Ok(job) => job,
            Err(DbError::NotFound(_)) => return Ok(self.ignored(id, expected, None)),
            Err(e) => return Err(e.into()),
        };

        let actual = job.state();
        let Some(status) = (actual == expected).then(|| next(&job.status)).flatten() else {
            return Ok(self.ignored(id, expected, Some(actual)));
        };
        let new_status = status.state();

        match self
            .storage
            .update_job_status(id, expected, status, progress)
            .await
        {
            Ok(_) => {
                tracing::info!(job_id = %id, "Job {} -> {}", expected, new_status);
                self.emit(JobEvent::JobStatusChanged {
                    job_id: id,
                    old_status: expected,
                    new_status,
                    timestamp: Utc::now(),
                });
                Ok(CallbackOutcome::Applied)
            }
            Err(DbError::StatusMismatch { actual, .. }) => {
                Ok(self.ignored(id, expected, Some(actual)))
            }
            Err(DbError::NotFound(_)) => Ok(self.ignored(id, expected, None)),
            Err(e) => Err(e.into()),
        }
    }

    async fn report_started(&self, id: JobId) -> Result<CallbackOutcome, LifecycleError> {
        let now = Utc::now();
        self.advance(id, JobState::Queued, |s| s.processing(now), None)
            .instrument(tracing::debug_span!("report-started", job_id = %id))
            .await
    }

    async fn report_progress(
        &self,
        id: JobId,
        percent: i64,
    ) -> Result<CallbackOutcome, LifecycleError> {
        let percent = percent.clamp(0, 100) as u8;
        match self.storage.update_job_progress(id, percent).await {
            Ok(_) => {
                tracing::debug!(job_id = %id, percent, "Job progress");
                self.emit(JobEvent::JobProgress {
                    job_id: id,
                    percent,
                    timestamp: Utc::now(),
                });
                Ok(CallbackOutcome::Applied)
            }
            Err(DbError::StatusMismatch { actual, .. }) => {
                Ok(self.ignored(id, JobState::Processing, Some(actual)))
            }
            Err(DbError::NotFound(_)) => Ok(self.ignored(id, JobState::Processing, None)),
            Err(e) => Err(e.into()),
        }
    }

    async fn report_finished(&self, id: JobId) -> Result<CallbackOutcome, LifecycleError> {
        let now = Utc::now();
        self.advance(id, JobState::Processing, |s| s.finished(now), Some(100))
            .instrument(tracing::debug_span!("report-finished", job_id = %id))
            .await
    }

    async fn report_failed(
        &self,
        id: JobId,
        cause: String,
    ) -> Result<CallbackOutcome, LifecycleError> {
        let now = Utc::now();
        self.advance(id, JobState::Processing, |s| s.failed(now, cause), None)
            .instrument(tracing::debug_span!("report-failed", job_id = %id))
            .await
    }
}

/// The callback handle given to the encoder with every job.
#[derive(Clone)]
pub struct StatusReporter {
    core: Arc<Core>,
}

impl StatusReporter {
    /// `queued -> processing`.
    pub async fn started(&self, id: JobId) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_started(id).await
    }

    /// Record progress while `processing`. Values are clamped to 0-100.
    pub async fn progress(&self, id: JobId, percent: i64) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_progress(id, percent).await
    }

    /// `processing -> finished`.
    pub async fn finished(&self, id: JobId) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_finished(id).await
    }

    /// `processing -> error`, recording `cause`.
    pub async fn failed(
        &self,
        id: JobId,
        cause: impl Into<String>,
    ) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_failed(id, cause.into()).await
    }
}

#[cfg(test)]
impl StatusReporter {
    /// A reporter on `storage` with nobody listening for events.
    pub(crate) fn detached(storage: Arc<dyn Storage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            core: Arc::new(Core { storage, events }),
        }
    }
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("backend", &self.core.storage.backend())
            .finish()
    }
}

/// Handle to the lifecycle engine. Cheap to clone and safe to share across
/// tasks.
#[derive(Clone)]
pub struct JobLifecycle {
    core: Arc<Core>,
    dispatcher: ActorRef<DispatcherMessage>,
}

impl JobLifecycle {
    /// Build the engine on `storage` and spawn its dispatcher and workers.
    pub async fn start_with(
        storage: Arc<dyn Storage>,
        encoder: Arc<dyn Encoder>,
        config: DispatcherConfig,
    ) -> Result<Self, LifecycleError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let core = Arc::new(Core { storage, events });
        let args = DispatcherArgs {
            config,
            encoder,
            reporter: StatusReporter { core: core.clone() },
        };

        let (dispatcher, _handle) = Actor::spawn(None, DispatcherActor, args)
            .await
            .map_err(|e| LifecycleError::Overloaded(format!("Failed to spawn dispatcher: {}", e)))?;

        Ok(Self { core, dispatcher })
    }

    /// The storage this engine runs on.
    pub fn storage(&self) -> Arc<dyn Storage> {
        self.core.storage.clone()
    }

    /// A reporter bound to this engine, for encoders driven from outside
    /// the worker pool.
    pub fn reporter(&self) -> StatusReporter {
        StatusReporter {
            core: self.core.clone(),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.core.events.subscribe()
    }

    // Jobs

    /// Validate the input, snapshot the named preset and store a new job in
    /// `created`.
    pub async fn submit(&self, input: JobInput) -> Result<Job, LifecycleError> {
        let span = tracing::debug_span!("create-job", preset = %input.preset);
        async move {
            tracing::debug!("started");
            input.validate().map_err(LifecycleError::BadInput)?;

            let preset = self.core.storage.retrieve_preset(&input.preset).await?;
            let job = Job::new(input, preset);
            self.core.storage.store_job(&job).await?;

            tracing::info!(job_id = %job.id, "Job created");
            self.core.emit(JobEvent::JobCreated {
                job: job.clone(),
                timestamp: Utc::now(),
            });
            tracing::debug!("finished");
            Ok(job)
        }
        .instrument(span)
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Job, LifecycleError> {
        let span = tracing::debug_span!("get-job", job_id = %id);
        async move {
            tracing::debug!("started");
            let id = parse_job_id(id)?;
            let job = self.core.storage.retrieve_job(id).await?;
            tracing::debug!("finished");
            Ok(job)
        }
        .instrument(span)
        .await
    }

    /// All jobs in creation order.
    pub async fn list(&self) -> Result<Vec<Job>, LifecycleError> {
        let span = tracing::debug_span!("list-jobs");
        async move {
            tracing::debug!("started");
            let jobs = self.core.storage.get_jobs().await?;
            tracing::debug!(count = jobs.len(), "finished");
            Ok(jobs)
        }
        .instrument(span)
        .await
    }

    /// Move a `created` job to `queued` and hand it to the dispatcher.
    ///
    /// Returns as soon as the job is queued. Of several concurrent calls for
    /// one job exactly one succeeds; the rest get `InvalidState`.
    pub async fn start(&self, id: &str) -> Result<Job, LifecycleError> {
        let span = tracing::debug_span!("start-job", job_id = %id);
        async move {
            tracing::debug!("started");
            let id = parse_job_id(id)?;
            let job = self.core.storage.retrieve_job(id).await.map_err(|e| match e {
                DbError::NotFound(_) => LifecycleError::JobNotFound(id.to_string()),
                other => other.into(),
            })?;
            if job.state() != JobState::Created {
                return Err(LifecycleError::InvalidState {
                    id,
                    expected: JobState::Created,
                    actual: job.state(),
                });
            }

            self.reserve().await?;

            let queued = match self
                .core
                .storage
                .update_job_status(id, JobState::Created, JobStatus::queued(Utc::now()), None)
                .await
            {
                Ok(job) => job,
                Err(e) => {
                    let _ = self.dispatcher.send_message(DispatcherMessage::Release);
                    return Err(match e {
                        DbError::StatusMismatch {
                            id,
                            expected,
                            actual,
                        } => LifecycleError::InvalidState {
                            id,
                            expected,
                            actual,
                        },
                        DbError::NotFound(_) => LifecycleError::JobNotFound(id.to_string()),
                        other => other.into(),
                    });
                }
            };

            tracing::info!(job_id = %id, "Job created -> queued");
            self.core.emit(JobEvent::JobStatusChanged {
                job_id: id,
                old_status: JobState::Created,
                new_status: JobState::Queued,
                timestamp: Utc::now(),
            });

            // The job is queued in the store from here on, so Start reports
            // success even if the hand-off fails. Such a job stays queued
            // with nothing to run it.
            if let Err(e) = self.dispatcher.send_message(DispatcherMessage::Dispatch {
                job: Box::new(queued.clone()),
            }) {
                tracing::error!(
                    job_id = %id,
                    "Dispatcher stopped before hand-off, job left queued: {}",
                    e
                );
            }

            tracing::debug!("finished");
            Ok(queued)
        }
        .instrument(span)
        .await
    }

    async fn reserve(&self) -> Result<(), LifecycleError> {
        let result = ractor::rpc::call(
            &self.dispatcher,
            |reply| DispatcherMessage::Reserve { reply },
            Some(DISPATCHER_CALL_TIMEOUT),
        )
        .await;
        match result {
            Ok(ractor::rpc::CallResult::Success(true)) => Ok(()),
            Ok(ractor::rpc::CallResult::Success(false)) => Err(LifecycleError::Overloaded(
                "pending queue is full or draining".into(),
            )),
            _ => Err(LifecycleError::Overloaded("dispatcher is not running".into())),
        }
    }

    // Encoder callbacks

    pub async fn report_started(&self, id: JobId) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_started(id).await
    }

    pub async fn report_progress(
        &self,
        id: JobId,
        percent: i64,
    ) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_progress(id, percent).await
    }

    pub async fn report_finished(&self, id: JobId) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_finished(id).await
    }

    pub async fn report_failed(
        &self,
        id: JobId,
        cause: impl Into<String>,
    ) -> Result<CallbackOutcome, LifecycleError> {
        self.core.report_failed(id, cause.into()).await
    }

    // Presets

    pub async fn create_preset(&self, preset: Preset) -> Result<Preset, LifecycleError> {
        let span = tracing::debug_span!("create-preset", preset = %preset.name);
        async move {
            tracing::debug!("started");
            preset.validate().map_err(LifecycleError::BadInput)?;
            let name = self.core.storage.store_preset(&preset).await?;
            let stored = self.core.storage.retrieve_preset(&name).await?;

            tracing::info!(preset = %name, "Preset created");
            self.core.emit(JobEvent::PresetCreated {
                preset: stored.clone(),
                timestamp: Utc::now(),
            });
            tracing::debug!("finished");
            Ok(stored)
        }
        .instrument(span)
        .await
    }

    pub async fn get_preset(&self, name: &str) -> Result<Preset, LifecycleError> {
        let span = tracing::debug_span!("get-preset", preset = %name);
        async move {
            tracing::debug!("started");
            let preset = self.core.storage.retrieve_preset(name).await?;
            tracing::debug!("finished");
            Ok(preset)
        }
        .instrument(span)
        .await
    }

    /// All presets sorted by name.
    pub async fn list_presets(&self) -> Result<Vec<Preset>, LifecycleError> {
        let span = tracing::debug_span!("list-presets");
        async move {
            tracing::debug!("started");
            let presets = self.core.storage.get_presets().await?;
            tracing::debug!(count = presets.len(), "finished");
            Ok(presets)
        }
        .instrument(span)
        .await
    }

    /// Replace the description and params of preset `name`. The body may not
    /// rename it.
    pub async fn update_preset(&self, name: &str, preset: Preset) -> Result<Preset, LifecycleError> {
        let span = tracing::debug_span!("update-preset", preset = %name);
        async move {
            tracing::debug!("started");
            if preset.name != name {
                return Err(LifecycleError::BadInput(format!(
                    "preset name {} does not match {}",
                    preset.name, name
                )));
            }
            let updated = self.core.storage.update_preset(name, &preset).await?;

            tracing::info!(preset = %name, "Preset updated");
            self.core.emit(JobEvent::PresetUpdated {
                preset: updated.clone(),
                timestamp: Utc::now(),
            });
            tracing::debug!("finished");
            Ok(updated)
        }
        .instrument(span)
        .await
    }

    /// Delete a preset. Jobs keep their snapshots.
    pub async fn delete_preset(&self, name: &str) -> Result<(), LifecycleError> {
        let span = tracing::debug_span!("delete-preset", preset = %name);
        async move {
            tracing::debug!("started");
            self.core.storage.delete_preset(name).await?;

            tracing::info!(preset = %name, "Preset deleted");
            self.core.emit(JobEvent::PresetDeleted {
                name: name.to_string(),
                timestamp: Utc::now(),
            });
            tracing::debug!("finished");
            Ok(())
        }
        .instrument(span)
        .await
    }

    // Dispatcher

    pub async fn dispatcher_stats(&self) -> Result<DispatcherStats, LifecycleError> {
        let result = ractor::rpc::call(
            &self.dispatcher,
            |reply| DispatcherMessage::GetStats { reply },
            Some(DISPATCHER_CALL_TIMEOUT),
        )
        .await;
        match result {
            Ok(ractor::rpc::CallResult::Success(stats)) => Ok(stats),
            _ => Err(LifecycleError::Overloaded("dispatcher is not running".into())),
        }
    }

    /// Stop accepting Starts, wait for every queued and running invocation
    /// to return, then stop the workers.
    pub async fn drain(&self) -> Result<(), LifecycleError> {
        let result = ractor::rpc::call(
            &self.dispatcher,
            |reply| DispatcherMessage::Drain { reply },
            None,
        )
        .await;
        let _ = self.dispatcher.send_message(DispatcherMessage::Shutdown);
        match result {
            Ok(ractor::rpc::CallResult::Success(())) => {
                tracing::info!("Dispatcher drained");
                Ok(())
            }
            _ => Err(LifecycleError::Overloaded("dispatcher is not running".into())),
        }
    }
}

impl std::fmt::Debug for JobLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLifecycle")
            .field("backend", &self.core.storage.backend())
            .field("dispatcher", &self.dispatcher.get_id())
            .finish()
    }
}

/// A malformed id cannot name a job, so it is reported as not found.
fn parse_job_id(id: &str) -> Result<JobId, LifecycleError> {
    JobId::parse(id).map_err(|_| LifecycleError::JobNotFound(id.to_string()))
}
