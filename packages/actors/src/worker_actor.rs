//! Worker actor for invoking the encoder.

use std::sync::Arc;
use std::time::Duration;

use encode_core::Job;
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::encoder::Encoder;
use crate::lifecycle::StatusReporter;
use crate::messages::{DispatcherMessage, WorkerMessage};

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Job whose encode is in progress.
    pub current_job: Option<Job>,
    /// Dispatcher actor reference.
    pub dispatcher: ActorRef<DispatcherMessage>,
    pub encoder: Arc<dyn Encoder>,
    /// Callback handle passed to every encode.
    pub reporter: StatusReporter,
}

impl WorkerActorState {
    /// Check if the worker is idle.
    fn is_idle(&self) -> bool {
        self.current_job.is_none()
    }
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub dispatcher: ActorRef<DispatcherMessage>,
    pub encoder: Arc<dyn Encoder>,
    pub reporter: StatusReporter,
    pub poll_interval: Duration,
}

/// Worker actor that pulls queued jobs and runs the encoder on them.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!("Starting worker: {}", args.worker_id);

        // Start the poll loop
        let myself_clone = myself.clone();
        let poll_interval = args.poll_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;
                if myself_clone.send_message(WorkerMessage::Heartbeat).is_err() {
                    break;
                }
            }
        });

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            current_job: None,
            dispatcher: args.dispatcher,
            encoder: args.encoder,
            reporter: args.reporter,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::ProcessJob { job } => {
                let job = *job;
                let job_id = job.id;
                tracing::debug!(job_id = %job_id, worker = %state.worker_id, "Invoking encoder");

                let encode = state.encoder.encode(job, state.reporter.clone());
                let reporter = state.reporter.clone();
                let worker = myself.clone();
                let dispatcher = state.dispatcher.clone();
                let worker_id = state.worker_id.clone();

                // The encode runs off the handler so heartbeats and shutdown
                // are handled while it is in flight. Its own task turns a
                // panicking encoder into a failure.
                tokio::spawn(async move {
                    let failure = match tokio::spawn(encode).await {
                        Ok(Ok(())) => None,
                        Ok(Err(cause)) => Some(cause),
                        Err(join_err) => Some(format!("Encoder panicked: {}", join_err)),
                    };

                    if let Some(cause) = failure {
                        tracing::warn!(job_id = %job_id, "Encoder returned an error: {}", cause);
                        if let Err(e) = reporter.failed(job_id, cause).await {
                            tracing::error!(job_id = %job_id, "Failed to record encoder error: {}", e);
                        }
                    }

                    if worker.send_message(WorkerMessage::EncodeDone { job_id }).is_err() {
                        // Worker already stopped; tell the dispatcher directly.
                        let _ = dispatcher
                            .send_message(DispatcherMessage::InvocationDone { job_id, worker_id });
                    }
                });
            }

            WorkerMessage::EncodeDone { job_id } => {
                state.current_job = None;
                state.dispatcher.send_message(DispatcherMessage::InvocationDone {
                    job_id,
                    worker_id: state.worker_id.clone(),
                })?;
            }

            WorkerMessage::Shutdown => {
                tracing::debug!("Shutting down worker: {}", state.worker_id);
                myself.stop(None);
            }

            WorkerMessage::Heartbeat => {
                // If idle, request a job
                if state.is_idle() {
                    let timeout = Duration::from_secs(5);
                    let result = ractor::rpc::call(
                        &state.dispatcher,
                        |reply| DispatcherMessage::RequestJob {
                            worker_id: state.worker_id.clone(),
                            reply,
                        },
                        Some(timeout),
                    )
                    .await;
                    if let Ok(ractor::rpc::CallResult::Success(Some(job))) = result {
                        // Claim the slot now so queued heartbeats stay idle.
                        state.current_job = Some(job.clone());
                        myself.send_message(WorkerMessage::ProcessJob { job: Box::new(job) })?;
                    }
                }
            }
        }

        Ok(())
    }
}
