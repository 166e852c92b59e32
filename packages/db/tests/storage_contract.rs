mod common;

use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use db::{DbError, Storage};
use encode_core::{ErrorKind, JobId, JobState, JobStatus};

async fn presets_roundtrip(storage: Arc<dyn Storage>) -> Result<(), Box<dyn Error>> {
    let preset = common::preset("mobile").with_description("small screens");
    let name = storage.store_preset(&preset).await?;
    assert_eq!(name, "mobile");

    let loaded = storage.retrieve_preset("mobile").await?;
    assert_eq!(loaded.params, preset.params);
    assert_eq!(loaded.description.as_deref(), Some("small screens"));

    let duplicate = storage.store_preset(&common::preset("mobile")).await;
    assert!(matches!(duplicate, Err(DbError::Conflict(_))));

    storage.store_preset(&common::preset("desktop")).await?;
    let names: Vec<String> = storage
        .get_presets()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["desktop", "mobile"]);

    let mut changed = common::preset("mobile");
    changed.params = serde_json::json!({"video": {"height": 360}});
    let updated = storage.update_preset("mobile", &changed).await?;
    assert_eq!(updated.params["video"]["height"], 360);
    assert!(updated.description.is_none());
    assert_eq!(storage.retrieve_preset("mobile").await?.params, changed.params);

    let missing = storage.update_preset("tablet", &changed).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));

    storage.delete_preset("desktop").await?;
    let gone = storage.retrieve_preset("desktop").await;
    assert_eq!(gone.unwrap_err().kind(), ErrorKind::NotFound);

    let again = storage.delete_preset("desktop").await;
    assert!(matches!(again, Err(DbError::NotFound(_))));

    Ok(())
}

async fn jobs_roundtrip(storage: Arc<dyn Storage>) -> Result<(), Box<dyn Error>> {
    let first = common::job("mobile");
    let second = common::job("mobile");

    assert_eq!(storage.store_job(&first).await?, first.id);
    storage.store_job(&second).await?;

    let duplicate = storage.store_job(&first).await;
    assert!(matches!(duplicate, Err(DbError::Conflict(_))));

    let loaded = storage.retrieve_job(first.id).await?;
    assert_eq!(loaded.id, first.id);
    assert_eq!(loaded.source, first.source);
    assert_eq!(loaded.preset.params, first.preset.params);
    assert_eq!(loaded.state(), JobState::Created);

    let ids: Vec<JobId> = storage.get_jobs().await?.into_iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let missing = storage.retrieve_job(JobId::new()).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));

    Ok(())
}

async fn status_compare_and_set(storage: Arc<dyn Storage>) -> Result<(), Box<dyn Error>> {
    let job = common::job("mobile");
    storage.store_job(&job).await?;

    let queued = storage
        .update_job_status(job.id, JobState::Created, JobStatus::queued(Utc::now()), None)
        .await?;
    assert_eq!(queued.state(), JobState::Queued);

    // Second attempt from the same source state loses.
    let lost = storage
        .update_job_status(job.id, JobState::Created, JobStatus::queued(Utc::now()), None)
        .await;
    match lost {
        Err(DbError::StatusMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, JobState::Created);
            assert_eq!(actual, JobState::Queued);
        }
        other => panic!("expected status mismatch, got {:?}", other),
    }

    // Progress only applies while processing.
    let early = storage.update_job_progress(job.id, 10).await;
    assert_eq!(early.unwrap_err().kind(), ErrorKind::InvalidState);

    let processing = queued.status.processing(Utc::now()).unwrap();
    storage
        .update_job_status(job.id, JobState::Queued, processing.clone(), None)
        .await?;
    let progressed = storage.update_job_progress(job.id, 40).await?;
    assert_eq!(progressed.progress, 40);

    let finished = processing.finished(Utc::now()).unwrap();
    let done = storage
        .update_job_status(job.id, JobState::Processing, finished, Some(100))
        .await?;
    assert_eq!(done.state(), JobState::Finished);
    assert_eq!(done.progress, 100);
    assert_eq!(storage.retrieve_job(job.id).await?.state(), JobState::Finished);

    let unknown = storage
        .update_job_status(JobId::new(), JobState::Created, JobStatus::queued(Utc::now()), None)
        .await;
    assert!(matches!(unknown, Err(DbError::NotFound(_))));

    Ok(())
}

async fn params_survive_unchanged(storage: Arc<dyn Storage>) -> Result<(), Box<dyn Error>> {
    let params = serde_json::json!({
        "big": u64::MAX,
        "negative": i64::MIN,
        "ratio": 0.25,
        "null": null,
        "nested": {"keep": null, "list": [null, 1, "two", {"three": null}]},
        "empty": {}
    });
    let preset = encode_core::Preset::new("exact", params.clone());
    storage.store_preset(&preset).await?;
    assert_eq!(storage.retrieve_preset("exact").await?.params, params);
    assert_eq!(storage.get_presets().await?[0].params, params);

    let mut changed = preset.clone();
    changed.params["added"] = serde_json::Value::Null;
    let updated = storage.update_preset("exact", &changed).await?;
    assert_eq!(updated.params, changed.params);
    assert_eq!(storage.retrieve_preset("exact").await?.params, changed.params);

    let mut job = common::job("exact");
    job.preset = preset;
    storage.store_job(&job).await?;
    assert_eq!(storage.retrieve_job(job.id).await?.preset.params, params);
    assert_eq!(storage.get_jobs().await?[0].preset.params, params);

    Ok(())
}

async fn concurrent_cas_has_one_winner(storage: Arc<dyn Storage>) -> Result<(), Box<dyn Error>> {
    for _ in 0..8 {
        let job = common::job("mobile");
        storage.store_job(&job).await?;

        let attempts = (0..16).map(|_| {
            let storage = storage.clone();
            tokio::spawn(async move {
                storage
                    .update_job_status(job.id, JobState::Created, JobStatus::queued(Utc::now()), None)
                    .await
            })
        });

        let results = futures_util::future::join_all(attempts).await;
        let mut winners = 0;
        for result in results {
            match result? {
                Ok(_) => winners += 1,
                Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidState, "{}", e),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(storage.retrieve_job(job.id).await?.state(), JobState::Queued);
    }

    Ok(())
}

#[tokio::test]
async fn memory_presets() -> Result<(), Box<dyn Error>> {
    presets_roundtrip(common::memory()).await
}

#[tokio::test]
async fn memory_jobs() -> Result<(), Box<dyn Error>> {
    jobs_roundtrip(common::memory()).await
}

#[tokio::test]
async fn memory_status_cas() -> Result<(), Box<dyn Error>> {
    status_compare_and_set(common::memory()).await
}

#[tokio::test]
async fn surreal_presets() -> Result<(), Box<dyn Error>> {
    presets_roundtrip(common::surreal().await?).await
}

#[tokio::test]
async fn surreal_jobs() -> Result<(), Box<dyn Error>> {
    jobs_roundtrip(common::surreal().await?).await
}

#[tokio::test]
async fn surreal_status_cas() -> Result<(), Box<dyn Error>> {
    status_compare_and_set(common::surreal().await?).await
}

#[tokio::test]
async fn memory_params_fidelity() -> Result<(), Box<dyn Error>> {
    params_survive_unchanged(common::memory()).await
}

#[tokio::test]
async fn surreal_params_fidelity() -> Result<(), Box<dyn Error>> {
    params_survive_unchanged(common::surreal().await?).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn memory_concurrent_cas_has_one_winner() -> Result<(), Box<dyn Error>> {
    concurrent_cas_has_one_winner(common::memory()).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn surreal_concurrent_cas_has_one_winner() -> Result<(), Box<dyn Error>> {
    concurrent_cas_has_one_winner(common::surreal().await?).await
}
