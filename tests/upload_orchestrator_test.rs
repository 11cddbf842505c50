use std::sync::Arc;
use std::time::Duration;

use narvik::application::ports::{JobRepository, ObjectStoreGateway, UploadedPart};
use narvik::application::services::{UploadError, UploadOrchestrator};
use narvik::domain::{JobState, Stage, StorageKey};
use narvik::infrastructure::persistence::MemoryJobRepository;
use narvik::infrastructure::storage::MemoryGateway;

const PART_SIZE: u64 = 10 * 1024 * 1024;
const TTL: Duration = Duration::from_secs(3600);

fn orchestrator(
    gateway: &Arc<MemoryGateway>,
    jobs: &Arc<MemoryJobRepository>,
) -> UploadOrchestrator {
    UploadOrchestrator::new(
        Arc::clone(gateway) as Arc<dyn ObjectStoreGateway>,
        Arc::clone(jobs) as Arc<dyn JobRepository>,
        PART_SIZE,
        TTL,
    )
}

fn parts(n: i32) -> Vec<UploadedPart> {
    (1..=n)
        .map(|part_number| UploadedPart {
            part_number,
            e_tag: format!("etag-{}", part_number),
        })
        .collect()
}

#[tokio::test]
async fn given_zero_file_size_when_initiating_then_rejected() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());
    let orchestrator = orchestrator(&gateway, &jobs);

    let result = orchestrator.initiate("talk.mp4", 0).await;

    assert!(matches!(result, Err(UploadError::InvalidFileSize)));
}

#[tokio::test]
async fn given_fifty_mb_file_when_initiating_then_five_part_urls_minted() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());
    let orchestrator = orchestrator(&gateway, &jobs);

    let initiated = orchestrator
        .initiate("talk.mp4", 50 * 1024 * 1024)
        .await
        .expect("initiate failed");

    assert_eq!(initiated.part_urls.len(), 5);
    assert!(
        initiated
            .key
            .as_str()
            .ends_with(&format!("{}/original.mp4", initiated.job_id))
    );
}

#[tokio::test]
async fn given_file_exceeding_part_limit_when_initiating_then_rejected() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());
    let orchestrator = orchestrator(&gateway, &jobs);

    // 10_001 parts at the configured part size, one over the S3 ceiling.
    let result = orchestrator
        .initiate("archive.mp4", PART_SIZE * 10_000 + 1)
        .await;

    assert!(matches!(result, Err(UploadError::TooManyParts(10_001))));
}

#[tokio::test]
async fn given_completed_parts_when_finalizing_then_job_queued_for_transcode() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());
    let orchestrator = orchestrator(&gateway, &jobs);

    let initiated = orchestrator
        .initiate("talk.mp4", 50 * 1024 * 1024)
        .await
        .expect("initiate failed");

    let finalized = orchestrator
        .finalize(initiated.job_id, &parts(5))
        .await
        .expect("finalize failed");

    assert!(!finalized.already_completed);
    let job = jobs
        .get_by_id(initiated.job_id)
        .await
        .expect("query failed")
        .expect("job not created");
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.stage, Stage::Transcode);
    assert_eq!(job.retry_count, 0);
    assert_eq!(
        job.meta_str("source_key"),
        Some(initiated.key.as_str())
    );
    assert!(gateway.object(&initiated.key).is_some());
}

#[tokio::test]
async fn given_finalized_upload_when_finalizing_again_then_idempotent_and_single_job() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());
    let orchestrator = orchestrator(&gateway, &jobs);

    let initiated = orchestrator
        .initiate("talk.mp4", 50 * 1024 * 1024)
        .await
        .expect("initiate failed");

    let first = orchestrator
        .finalize(initiated.job_id, &parts(5))
        .await
        .expect("first finalize failed");
    let second = orchestrator
        .finalize(initiated.job_id, &parts(5))
        .await
        .expect("second finalize failed");

    assert!(!first.already_completed);
    assert!(second.already_completed);
    assert_eq!(first.job_id, second.job_id);

    // The second call must not have touched the single job row.
    let job = jobs
        .get_by_id(initiated.job_id)
        .await
        .expect("query failed")
        .expect("job missing");
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.stage, Stage::Transcode);
}

#[tokio::test]
async fn given_restarted_orchestrator_when_finalizing_then_session_recovered_from_storage() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());

    let initiated = orchestrator(&gateway, &jobs)
        .initiate("talk.mp4", 50 * 1024 * 1024)
        .await
        .expect("initiate failed");

    // New orchestrator instance: the in-process session map is gone, only
    // the in-flight multipart session in storage remains.
    let restarted = orchestrator(&gateway, &jobs);
    let finalized = restarted
        .finalize(initiated.job_id, &parts(5))
        .await
        .expect("finalize after restart failed");

    assert!(!finalized.already_completed);
    assert!(gateway.object(&initiated.key).is_some());
    assert!(
        jobs.get_by_id(initiated.job_id)
            .await
            .expect("query failed")
            .is_some()
    );
}

#[tokio::test]
async fn given_no_session_and_no_object_when_finalizing_then_session_not_found() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());
    let orchestrator = orchestrator(&gateway, &jobs);

    let job_id = narvik::domain::JobId::new();
    let result = orchestrator.finalize(job_id, &parts(1)).await;

    assert!(matches!(result, Err(UploadError::SessionNotFound(id)) if id == job_id));
    assert!(
        jobs.get_by_id(job_id)
            .await
            .expect("query failed")
            .is_none(),
        "no partial job row may be persisted on failure"
    );
}

#[tokio::test]
async fn given_object_uploaded_out_of_band_when_finalizing_then_treated_as_completed() {
    let gateway = Arc::new(MemoryGateway::new());
    let jobs = Arc::new(MemoryJobRepository::new());
    let orchestrator = orchestrator(&gateway, &jobs);

    // Object exists, but this orchestrator never saw the session.
    let job_id = narvik::domain::JobId::new();
    gateway.seed_object(&StorageKey::original(job_id, "mp4"), vec![1, 2, 3]);

    let finalized = orchestrator
        .finalize(job_id, &parts(1))
        .await
        .expect("finalize failed");

    assert!(finalized.already_completed);
}
