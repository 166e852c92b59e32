#![allow(dead_code)]

use std::sync::Arc;

use db::{DbConfig, DbError, MemoryStorage, Storage};
use encode_core::{Job, JobInput, Preset};

pub fn memory() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new())
}

/// Each `mem://` connection is a fresh embedded datastore, so tests do not
/// share state.
pub async fn surreal() -> Result<Arc<dyn Storage>, DbError> {
    db::open(&DbConfig::surreal_memory()).await
}

pub fn preset(name: &str) -> Preset {
    Preset::new(
        name,
        serde_json::json!({
            "container": "mp4",
            "video": {"codec": "h264", "height": 720, "bitrate": "1500000"},
            "audio": {"codec": "aac", "bitrate": "64000"}
        }),
    )
}

pub fn job(preset_name: &str) -> Job {
    Job::new(
        JobInput::new("s3://in/a.mp4", "s3://out/b.mp4", preset_name),
        preset(preset_name),
    )
}
