use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use narvik::application::ports::{
    AsrProvider, AudioExtractor, ExtractorError, JobRepository, ObjectStoreGateway, ProviderError,
    TranscribeOptions, Transcription, TranscriptRepository,
};
use narvik::application::services::{AsrHandler, PipelineWorker, TranscodeHandler, WorkerConfig};
use narvik::domain::{Job, JobId, JobState, Stage, StorageKey};
use narvik::infrastructure::persistence::{MemoryJobRepository, MemoryTranscriptRepository};
use narvik::infrastructure::storage::MemoryGateway;

struct StubExtractor;

#[async_trait]
impl AudioExtractor for StubExtractor {
    async fn extract(&self, media: &[u8], _source_ext: &str) -> Result<Vec<u8>, ExtractorError> {
        Ok(media.to_vec())
    }
}

/// Extractor that parks its first call until released, letting a test hold a
/// worker inside one job's transcode while the rest of the batch moves on.
struct GatedExtractor {
    entered: mpsc::Sender<()>,
    release: AsyncMutex<mpsc::Receiver<()>>,
    calls: AtomicU32,
}

#[async_trait]
impl AudioExtractor for GatedExtractor {
    async fn extract(&self, media: &[u8], _source_ext: &str) -> Result<Vec<u8>, ExtractorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.send(()).await.ok();
            self.release.lock().await.recv().await;
        }
        Ok(media.to_vec())
    }
}

/// Provider that never answers within any reasonable deadline.
struct SleepyProvider;

#[async_trait]
impl AsrProvider for SleepyProvider {
    fn name(&self) -> &'static str {
        "sleepy"
    }

    async fn transcribe(
        &self,
        _audio: &[u8],
        _options: &TranscribeOptions,
    ) -> Result<Transcription, ProviderError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ProviderError::ApiRequestFailed("unreachable".to_string()))
    }
}

/// Provider that fails its first `fail_times` calls, then succeeds.
struct FlakyProvider {
    name: &'static str,
    fail_times: u32,
    calls: AtomicU32,
}

impl FlakyProvider {
    fn new(name: &'static str, fail_times: u32) -> Self {
        Self {
            name,
            fail_times,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl AsrProvider for FlakyProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn transcribe(
        &self,
        _audio: &[u8],
        _options: &TranscribeOptions,
    ) -> Result<Transcription, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            return Err(ProviderError::ApiRequestFailed("quota exceeded".to_string()));
        }
        Ok(Transcription {
            raw_response: json!({ "text": "hello world" }),
            text: "hello world".to_string(),
            model_meta: json!({ "model": "stub" }),
        })
    }
}

struct Harness {
    jobs: Arc<MemoryJobRepository>,
    transcripts: Arc<MemoryTranscriptRepository>,
    gateway: Arc<MemoryGateway>,
    worker: Arc<PipelineWorker>,
}

fn build_harness(
    provider: Arc<dyn AsrProvider>,
    extractor: Arc<dyn AudioExtractor>,
    asr_timeout: Duration,
) -> Harness {
    let jobs = Arc::new(MemoryJobRepository::new());
    let transcripts = Arc::new(MemoryTranscriptRepository::new());
    let gateway = Arc::new(MemoryGateway::new());

    let worker = PipelineWorker::new(
        Arc::clone(&jobs) as Arc<dyn JobRepository>,
        TranscodeHandler::new(
            Arc::clone(&gateway) as Arc<dyn ObjectStoreGateway>,
            extractor,
        ),
        AsrHandler::new(
            Arc::clone(&gateway) as Arc<dyn ObjectStoreGateway>,
            provider,
            Arc::clone(&transcripts) as Arc<dyn TranscriptRepository>,
            asr_timeout,
        ),
        WorkerConfig {
            poll_interval: Duration::from_millis(10),
            max_retries: 3,
            stale_after: Duration::from_secs(600),
            claim_batch: 10,
        },
    );

    Harness {
        jobs,
        transcripts,
        gateway,
        worker: Arc::new(worker),
    }
}

fn harness(provider: Arc<dyn AsrProvider>) -> Harness {
    build_harness(provider, Arc::new(StubExtractor), Duration::from_secs(5))
}

async fn seed_job(h: &Harness) -> JobId {
    let job_id = JobId::new();
    let source_key = StorageKey::original(job_id, "mp4");
    h.gateway.seed_object(&source_key, b"fake media".to_vec());
    let job = Job::new(job_id, json!({ Job::META_SOURCE_KEY: source_key.as_str() }));
    h.jobs.create(&job).await.expect("create job");
    job_id
}

#[tokio::test]
async fn given_n_workers_racing_when_claiming_then_exactly_one_wins() {
    let jobs = Arc::new(MemoryJobRepository::new());
    let job_id = JobId::new();
    jobs.create(&Job::new(job_id, json!({})))
        .await
        .expect("create job");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let jobs = Arc::clone(&jobs);
        handles.push(tokio::spawn(async move { jobs.claim(job_id).await }));
    }

    let mut won = 0;
    for handle in handles {
        if handle.await.expect("task panicked").expect("claim failed") {
            won += 1;
        }
    }
    assert_eq!(won, 1, "exactly one claim may succeed");
}

#[tokio::test]
async fn given_queued_job_when_both_stages_succeed_then_done_with_transcript() {
    let h = harness(Arc::new(FlakyProvider::new("stub", 0)));
    let job_id = seed_job(&h).await;

    let mut stages = vec![];
    // Tick 1 runs transcode, tick 2 runs ASR.
    for _ in 0..2 {
        h.worker.tick().await.expect("tick failed");
        let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
        stages.push(job.stage);
    }

    let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.stage, Stage::AsrCompleted);
    assert_eq!(job.retry_count, 0);
    assert_eq!(job.meta_str("provider"), Some("stub"));

    // Forward-only progression.
    assert_eq!(stages, vec![Stage::Asr, Stage::AsrCompleted]);

    // Derived artifacts exist under the job prefix.
    assert!(h.gateway.object(&StorageKey::audio_artifact(job_id)).is_some());
    assert!(h.gateway.object(&StorageKey::raw_transcript(job_id)).is_some());
    assert_eq!(
        h.gateway.object(&StorageKey::text_transcript(job_id)),
        Some(b"hello world".to_vec())
    );

    let transcripts = h.transcripts.list_by_job(job_id).await.expect("query");
    assert_eq!(transcripts.len(), 1);
    assert_eq!(transcripts[0].provider, "stub");
}

#[tokio::test]
async fn given_provider_failing_once_when_processing_then_retried_to_done() {
    let h = harness(Arc::new(FlakyProvider::new("stub", 1)));
    let job_id = seed_job(&h).await;

    // transcode, asr (fails), asr retry (succeeds)
    for _ in 0..3 {
        h.worker.tick().await.expect("tick failed");
    }

    let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.retry_count, 1);

    let transcripts = h.transcripts.list_by_job(job_id).await.expect("query");
    assert_eq!(transcripts.len(), 1);
}

#[tokio::test]
async fn given_provider_failing_three_times_when_processing_then_job_failed_and_unclaimable() {
    let h = harness(Arc::new(FlakyProvider::new("stub", u32::MAX)));
    let job_id = seed_job(&h).await;

    for _ in 0..6 {
        h.worker.tick().await.expect("tick failed");
    }

    let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.stage, Stage::Asr, "failure sticks at the failing stage");
    assert_eq!(job.retry_count, 3);
    assert!(job.error_message.is_some());

    // No transcript, and the job is gone from claim queries.
    assert!(h.transcripts.list_by_job(job_id).await.expect("query").is_empty());
    assert!(h.jobs.list_eligible(10).await.expect("query").is_empty());
    assert!(!h.jobs.claim(job_id).await.expect("claim query"));
}

#[tokio::test]
async fn given_transcode_source_missing_when_retries_exhausted_then_failed_at_transcode() {
    let h = harness(Arc::new(FlakyProvider::new("stub", 0)));
    // Job without a source object in storage.
    let job_id = JobId::new();
    let source_key = StorageKey::original(job_id, "mp4");
    let job = Job::new(job_id, json!({ Job::META_SOURCE_KEY: source_key.as_str() }));
    h.jobs.create(&job).await.expect("create job");

    for _ in 0..4 {
        h.worker.tick().await.expect("tick failed");
    }

    let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.stage, Stage::Transcode);
}

#[tokio::test]
async fn given_job_stuck_in_processing_when_sweeping_then_requeued_without_retry_charge() {
    let h = harness(Arc::new(FlakyProvider::new("stub", 0)));
    let job_id = seed_job(&h).await;

    // Simulate a worker that claimed the job and crashed.
    assert!(h.jobs.claim(job_id).await.expect("claim failed"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let swept = h
        .jobs
        .requeue_stale(Duration::from_millis(1))
        .await
        .expect("sweep failed");
    assert_eq!(swept, 1);

    let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.stage, Stage::Transcode);
    assert_eq!(job.retry_count, 0, "a crash is not a handler failure");
}

#[tokio::test]
async fn given_job_advanced_by_another_worker_mid_batch_when_claimed_then_dispatched_on_fresh_stage() {
    let (entered_tx, mut entered_rx) = mpsc::channel(1);
    let (release_tx, release_rx) = mpsc::channel(1);
    let gated = Arc::new(GatedExtractor {
        entered: entered_tx,
        release: AsyncMutex::new(release_rx),
        calls: AtomicU32::new(0),
    });
    let h = build_harness(
        Arc::new(FlakyProvider::new("stub", 0)),
        Arc::clone(&gated) as Arc<dyn AudioExtractor>,
        Duration::from_secs(5),
    );

    let first = seed_job(&h).await;
    let second = seed_job(&h).await;

    let worker = Arc::clone(&h.worker);
    let tick = tokio::spawn(async move { worker.tick().await });

    entered_rx.recv().await.expect("transcode never started");

    // While this worker sits inside the first job's transcode, another
    // worker claims the second job, completes its transcode and requeues it
    // at the ASR stage.
    assert!(h.jobs.claim(second).await.expect("claim failed"));
    let audio_key = StorageKey::audio_artifact(second);
    h.gateway.seed_object(&audio_key, b"audio".to_vec());
    h.jobs
        .advance(
            second,
            Stage::Asr,
            json!({ Job::META_AUDIO_KEY: audio_key.as_str() }),
        )
        .await
        .expect("advance failed");

    release_tx.send(()).await.expect("release failed");
    tick.await.expect("task panicked").expect("tick failed");

    assert_eq!(
        gated.calls.load(Ordering::SeqCst),
        1,
        "an already-advanced job must not be re-transcoded"
    );
    let second_row = h.jobs.get_by_id(second).await.expect("query").expect("job");
    assert_eq!(second_row.state, JobState::Done);
    assert_eq!(second_row.stage, Stage::AsrCompleted);
    let first_row = h.jobs.get_by_id(first).await.expect("query").expect("job");
    assert_eq!(first_row.state, JobState::Queued);
    assert_eq!(first_row.stage, Stage::Asr);
}

#[tokio::test]
async fn given_provider_exceeding_deadline_when_processing_then_timeout_counts_as_failure() {
    let h = build_harness(
        Arc::new(SleepyProvider),
        Arc::new(StubExtractor),
        Duration::from_millis(10),
    );
    let job_id = seed_job(&h).await;

    // transcode, then the first ASR attempt hits the deadline
    h.worker.tick().await.expect("tick failed");
    h.worker.tick().await.expect("tick failed");

    let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.stage, Stage::Asr);
    assert_eq!(job.retry_count, 1);
    let message = job.error_message.clone().expect("error recorded");
    assert!(message.contains("timed out"), "{message}");

    for _ in 0..2 {
        h.worker.tick().await.expect("tick failed");
    }

    let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.retry_count, 3);
    assert!(h.transcripts.list_by_job(job_id).await.expect("query").is_empty());
}

#[tokio::test]
async fn given_different_providers_when_processing_then_only_provider_and_meta_differ() {
    for provider_name in ["stub_a", "stub_b"] {
        let h = harness(Arc::new(FlakyProvider::new(provider_name, 0)));
        let job_id = seed_job(&h).await;

        for _ in 0..2 {
            h.worker.tick().await.expect("tick failed");
        }

        let job = h.jobs.get_by_id(job_id).await.expect("query").expect("job");
        assert_eq!(job.state, JobState::Done);

        let transcripts = h.transcripts.list_by_job(job_id).await.expect("query");
        assert_eq!(transcripts.len(), 1);
        assert_eq!(transcripts[0].provider, provider_name);
        assert_eq!(
            h.gateway.object(&StorageKey::text_transcript(job_id)),
            Some(b"hello world".to_vec())
        );
    }
}
