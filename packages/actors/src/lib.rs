//! Job lifecycle engine and its actor system.
//!
//! This crate provides the [`JobLifecycle`] engine and the Ractor-based
//! dispatcher that hands queued jobs to the external encoder.
//!
//! # Architecture
//!
//! - `JobLifecycle` - Validates and persists jobs and presets, drives Start
//! - `DispatcherActor` - Owns the bounded pending queue and the worker pool
//! - `WorkerActor` - Invokes the encoder for one job at a time
//!
//! # Usage
//!
//! ```ignore
//! use actors::{DispatcherConfig, JobLifecycle, LoggingEncoder};
//!
//! let engine = JobLifecycle::start_with(
//!     storage,
//!     Arc::new(LoggingEncoder::new()),
//!     DispatcherConfig::default(),
//! )
//! .await?;
//!
//! let job = engine.submit(JobInput::new("a.mp4", "b.mp4", "mobile")).await?;
//! engine.start(&job.id.to_string()).await?;
//! ```

mod dispatcher;
mod encoder;
mod lifecycle;
mod messages;
mod worker_actor;

pub use dispatcher::{DispatcherActor, DispatcherArgs, DispatcherConfig};
pub use encoder::{EncodeFuture, EncodeResult, Encoder, FnEncoder, LoggingEncoder};
pub use lifecycle::{CallbackOutcome, JobLifecycle, StatusReporter};
pub use messages::{DispatcherMessage, DispatcherStats, LifecycleError, WorkerMessage};
pub use worker_actor::WorkerActor;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
