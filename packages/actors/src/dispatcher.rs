//! Dispatcher actor: the bounded hand-off between Start and the encoder.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use encode_core::{Job, JobId};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SupervisionEvent};

use crate::encoder::Encoder;
use crate::lifecycle::StatusReporter;
use crate::messages::{DispatcherMessage, DispatcherStats, WorkerMessage};
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// Sizing for the dispatcher and its worker pool.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of workers invoking the encoder concurrently.
    pub workers: usize,
    /// Capacity of the pending queue, reservations included.
    pub max_pending: usize,
    /// How often idle workers ask for the next job.
    pub poll_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_pending: 64,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl DispatcherConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Arguments for spawning the dispatcher.
pub struct DispatcherArgs {
    pub config: DispatcherConfig,
    pub encoder: Arc<dyn Encoder>,
    pub reporter: StatusReporter,
}

/// State for the dispatcher actor.
pub struct DispatcherState {
    config: DispatcherConfig,
    /// Queued jobs waiting for a worker, oldest first.
    pending: VecDeque<Job>,
    /// Slots claimed by in-flight Start calls.
    reserved: usize,
    /// Jobs handed to a worker, with the worker's id.
    running: HashMap<JobId, String>,
    draining: bool,
    drain_waiters: Vec<RpcReplyPort<()>>,
    workers: Vec<ActorRef<WorkerMessage>>,
    encoder: Arc<dyn Encoder>,
    reporter: StatusReporter,
}

impl DispatcherState {
    pub fn new(args: DispatcherArgs) -> Self {
        Self {
            config: args.config,
            pending: VecDeque::new(),
            reserved: 0,
            running: HashMap::new(),
            draining: false,
            drain_waiters: Vec::new(),
            workers: Vec::new(),
            encoder: args.encoder,
            reporter: args.reporter,
        }
    }

    fn has_capacity(&self) -> bool {
        self.pending.len() + self.reserved < self.config.max_pending
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running.is_empty() && self.reserved == 0
    }

    fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            pending: self.pending.len(),
            reserved: self.reserved,
            running: self.running.len(),
            max_pending: self.config.max_pending,
            draining: self.draining,
        }
    }

    /// Answer drain waiters once the last job is out.
    fn check_drained(&mut self) {
        if self.draining && self.is_idle() {
            for waiter in self.drain_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

/// Dispatcher actor that owns the pending queue and the worker pool.
pub struct DispatcherActor;

impl Actor for DispatcherActor {
    type Msg = DispatcherMessage;
    type State = DispatcherState;
    type Arguments = DispatcherArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            "Starting dispatcher: encoder={}, workers={}, max_pending={}",
            args.encoder.name(),
            args.config.workers,
            args.config.max_pending
        );
        Ok(DispatcherState::new(args))
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        for n in 0..state.config.workers {
            let worker_id = format!("encode-worker-{}-{}", myself.get_id(), n + 1);
            let args = WorkerArgs {
                worker_id: worker_id.clone(),
                dispatcher: myself.clone(),
                encoder: state.encoder.clone(),
                reporter: state.reporter.clone(),
                poll_interval: state.config.poll_interval,
            };

            let (worker, _handle) =
                Actor::spawn_linked(Some(worker_id), WorkerActor, args, myself.get_cell())
                    .await
                    .map_err(|e| {
                        ActorProcessingErr::from(format!("Failed to spawn worker: {}", e))
                    })?;
            state.workers.push(worker);
        }
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DispatcherMessage::Reserve { reply } => {
                let granted = !state.draining && state.has_capacity();
                if granted {
                    state.reserved += 1;
                }
                let _ = reply.send(granted);
            }

            DispatcherMessage::Release => {
                state.reserved = state.reserved.saturating_sub(1);
                state.check_drained();
            }

            DispatcherMessage::Dispatch { job } => {
                state.reserved = state.reserved.saturating_sub(1);
                tracing::debug!(job_id = %job.id, "Job dispatched");
                state.pending.push_back(*job);
            }

            DispatcherMessage::RequestJob { worker_id, reply } => {
                if let Some(job) = state.pending.pop_front() {
                    state.running.insert(job.id, worker_id);
                    let _ = reply.send(Some(job));
                } else {
                    let _ = reply.send(None);
                }
            }

            DispatcherMessage::InvocationDone { job_id, worker_id } => {
                if state.running.remove(&job_id).is_some() {
                    tracing::debug!(job_id = %job_id, worker = %worker_id, "Invocation done");
                }
                state.check_drained();
            }

            DispatcherMessage::Drain { reply } => {
                if !state.draining {
                    tracing::info!(
                        "Draining dispatcher: pending={}, running={}",
                        state.pending.len(),
                        state.running.len()
                    );
                }
                state.draining = true;
                state.drain_waiters.push(reply);
                state.check_drained();
            }

            DispatcherMessage::GetStats { reply } => {
                let _ = reply.send(state.stats());
            }

            DispatcherMessage::Shutdown => {
                tracing::info!("Shutting down dispatcher");
                for worker in &state.workers {
                    let _ = worker.send_message(WorkerMessage::Shutdown);
                }
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                tracing::debug!(
                    "Worker {} terminated: {:?}",
                    cell.get_name().unwrap_or_default(),
                    reason
                );
            }
            SupervisionEvent::ActorFailed(cell, err) => {
                let name = cell.get_name().unwrap_or_default();
                tracing::error!("Worker {} failed: {}", name, err);
                state.running.retain(|_, worker_id| *worker_id != name);
                state.workers.retain(|w| w.get_id() != cell.get_id());
                state.check_drained();
            }
            _ => {}
        }
        Ok(())
    }
}
