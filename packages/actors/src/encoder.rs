//! The encoder contract and the stock encoders.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use encode_core::Job;

use crate::lifecycle::{CallbackOutcome, StatusReporter};

/// Result type for an encoder invocation. `Err` carries the failure cause.
pub type EncodeResult = Result<(), String>;

/// Future type for async encoder invocations.
pub type EncodeFuture = Pin<Box<dyn Future<Output = EncodeResult> + Send>>;

/// The external collaborator that performs the media work.
///
/// An encoder receives the queued job together with a [`StatusReporter`] and
/// reports `started`, any `progress`, and then `finished` or `failed` through
/// it. The lifecycle engine records whatever the encoder reports; an `Err`
/// return is recorded as a failure if the job is still processing.
pub trait Encoder: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Run the encode for one job.
    fn encode(&self, job: Job, reporter: StatusReporter) -> EncodeFuture;
}

/// A simple function-based encoder.
pub struct FnEncoder<F>
where
    F: Fn(Job, StatusReporter) -> EncodeFuture + Send + Sync + 'static,
{
    name: String,
    encoder: F,
}

impl<F> FnEncoder<F>
where
    F: Fn(Job, StatusReporter) -> EncodeFuture + Send + Sync + 'static,
{
    /// Create a new function-based encoder.
    pub fn new(name: impl Into<String>, encoder: F) -> Self {
        Self {
            name: name.into(),
            encoder,
        }
    }
}

impl<F> Encoder for FnEncoder<F>
where
    F: Fn(Job, StatusReporter) -> EncodeFuture + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, job: Job, reporter: StatusReporter) -> EncodeFuture {
        (self.encoder)(job, reporter)
    }
}

/// An encoder that does no media work and walks each job through the
/// callback surface: started, a few progress steps, then finished.
///
/// A preset whose params contain `"fail": true` makes the job fail instead.
#[derive(Debug, Clone)]
pub struct LoggingEncoder {
    steps: u8,
    step_delay: Duration,
}

impl Default for LoggingEncoder {
    fn default() -> Self {
        Self {
            steps: 4,
            step_delay: Duration::from_millis(250),
        }
    }
}

impl LoggingEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of progress steps.
    pub fn with_steps(mut self, steps: u8) -> Self {
        self.steps = steps.max(1);
        self
    }

    /// Set the pause between progress steps.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }
}

impl Encoder for LoggingEncoder {
    fn name(&self) -> &str {
        "logging"
    }

    fn encode(&self, job: Job, reporter: StatusReporter) -> EncodeFuture {
        let steps = self.steps;
        let delay = self.step_delay;

        Box::pin(async move {
            let id = job.id;
            if reporter.started(id).await.map_err(|e| e.to_string())? == CallbackOutcome::Ignored
            {
                return Ok(());
            }
            tracing::info!(
                job_id = %id,
                preset = %job.preset.name,
                "Encoding {} -> {}",
                job.source,
                job.destination
            );

            if job.preset.params.get("fail").and_then(|v| v.as_bool()) == Some(true) {
                reporter
                    .failed(id, "preset requested failure")
                    .await
                    .map_err(|e| e.to_string())?;
                return Ok(());
            }

            for step in 1..steps {
                tokio::time::sleep(delay).await;
                let percent = u32::from(step) * 100 / u32::from(steps);
                reporter
                    .progress(id, percent as i64)
                    .await
                    .map_err(|e| e.to_string())?;
            }

            tokio::time::sleep(delay).await;
            reporter.finished(id).await.map_err(|e| e.to_string())?;
            tracing::info!(job_id = %id, "Encoding finished");
            Ok(())
        })
    }
}
