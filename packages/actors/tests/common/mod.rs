#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use actors::{DispatcherConfig, EncodeFuture, Encoder, FnEncoder, JobLifecycle, StatusReporter};
use db::{MemoryStorage, Storage};
use encode_core::{Job, JobInput, Preset};
use tokio::sync::mpsc;

/// Records every invocation and reports nothing, leaving the job queued so
/// tests drive the callbacks themselves.
pub struct Recording {
    pub encoder: Arc<dyn Encoder>,
    pub calls: Arc<AtomicUsize>,
    pub invoked: mpsc::UnboundedReceiver<Job>,
}

impl Recording {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait for the next invocation.
    pub async fn next(&mut self) -> Job {
        tokio::time::timeout(Duration::from_secs(5), self.invoked.recv())
            .await
            .expect("encoder was not invoked in time")
            .expect("encoder channel closed")
    }
}

pub fn recording() -> Recording {
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, invoked) = mpsc::unbounded_channel();
    let counter = calls.clone();
    let encoder = FnEncoder::new(
        "recording",
        move |job: Job, _reporter: StatusReporter| -> EncodeFuture {
            counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(job);
                Ok(())
            })
        },
    );

    Recording {
        encoder: Arc::new(encoder),
        calls,
        invoked,
    }
}

pub fn memory() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new())
}

/// Workers poll quickly so tests do not wait on the default interval.
pub fn fast_config() -> DispatcherConfig {
    DispatcherConfig::default().with_poll_interval(Duration::from_millis(5))
}

pub async fn engine(storage: Arc<dyn Storage>, encoder: Arc<dyn Encoder>) -> JobLifecycle {
    JobLifecycle::start_with(storage, encoder, fast_config())
        .await
        .expect("engine starts")
}

pub fn mobile() -> Preset {
    Preset::new(
        "mobile",
        serde_json::json!({
            "container": "mp4",
            "video": {"codec": "h264", "height": 480, "bitrate": "800000"},
            "audio": {"codec": "aac", "bitrate": "64000"}
        }),
    )
    .with_description("phones and small tablets")
}

pub fn input(preset: &str) -> JobInput {
    JobInput::new("a.mp4", "b.mp4", preset)
}
