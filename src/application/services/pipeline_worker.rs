use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{Job, JobState, Stage};

use super::asr_handler::AsrHandler;
use super::handler::{HandlerError, StageOutcome};
use super::transcode_handler::TranscodeHandler;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub max_retries: i32,
    /// Jobs stuck in `Processing` longer than this are assumed orphaned by a
    /// crashed worker and swept back to `Queued`.
    pub stale_after: Duration,
    /// How many queued jobs one tick will attempt to claim before yielding.
    pub claim_batch: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_retries: 3,
            stale_after: Duration::from_secs(600),
            claim_batch: 10,
        }
    }
}

/// Independent polling loop: sweeps stale jobs, atomically claims eligible
/// ones and dispatches them to the stage handler matching their stage.
///
/// Any number of these can run concurrently, in one process or many; all
/// coordination goes through the repository's conditional updates. A single
/// job's failure never stops the loop.
pub struct PipelineWorker {
    job_repository: Arc<dyn JobRepository>,
    transcode: TranscodeHandler,
    asr: AsrHandler,
    config: WorkerConfig,
}

impl PipelineWorker {
    pub fn new(
        job_repository: Arc<dyn JobRepository>,
        transcode: TranscodeHandler,
        asr: AsrHandler,
        config: WorkerConfig,
    ) -> Self {
        Self {
            job_repository,
            transcode,
            asr,
            config,
        }
    }

    pub async fn run(self) {
        tracing::info!(
            poll_interval_s = self.config.poll_interval.as_secs(),
            "Pipeline worker started"
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "Worker tick failed");
            }
        }
    }

    /// One poll cycle. Public so tests can drive the worker without timers.
    pub async fn tick(&self) -> Result<(), RepositoryError> {
        let swept = self
            .job_repository
            .requeue_stale(self.config.stale_after)
            .await?;
        if swept > 0 {
            tracing::warn!(count = swept, "Requeued stale processing jobs");
        }

        let eligible = self.job_repository.list_eligible(self.config.claim_batch).await?;
        for job in eligible {
            if !self.job_repository.claim(job.id).await? {
                // Another worker won this row; move on.
                continue;
            }
            // The snapshot can be stale by the time the claim lands: a stage
            // handler earlier in the batch may run for minutes, during which
            // another worker can process this job and requeue it at a later
            // stage. Dispatch on the row as claimed, not as listed.
            match self.job_repository.get_by_id(job.id).await? {
                Some(claimed) => self.process(claimed).await,
                None => tracing::error!(job_id = %job.id, "Claimed job no longer exists"),
            }
        }

        Ok(())
    }

    async fn process(&self, job: Job) {
        let span = tracing::info_span!(
            "pipeline_job",
            job_id = %job.id,
            stage = %job.stage,
            retry_count = job.retry_count,
        );

        async {
            let result = match job.stage {
                Stage::Transcode => self.transcode.handle(&job).await,
                Stage::Asr => self.asr.handle(&job).await,
                Stage::AsrCompleted => {
                    // Terminal stage rows are never queued; a claim here means
                    // corrupted state, not a handler failure.
                    tracing::error!("Claimed a job in terminal stage");
                    return;
                }
            };

            match result {
                Ok(outcome) => self.apply(job, outcome).await,
                Err(e) => self.fail(job, e).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn apply(&self, job: Job, outcome: StageOutcome) {
        let applied = match outcome {
            StageOutcome::Advance { next, meta_patch } => {
                tracing::info!(next_stage = %next, "Stage completed");
                self.job_repository.advance(job.id, next, meta_patch).await
            }
            StageOutcome::Complete { meta_patch } => {
                tracing::info!("Pipeline completed");
                self.job_repository.finish(job.id, meta_patch).await
            }
        };
        if let Err(e) = applied {
            tracing::error!(error = %e, "Failed to apply stage transition");
        }
    }

    async fn fail(&self, job: Job, error: HandlerError) {
        tracing::warn!(error = %error, "Stage handler failed");
        match self
            .job_repository
            .record_failure(job.id, &error.to_string(), self.config.max_retries)
            .await
        {
            Ok(JobState::Failed) => {
                tracing::error!(
                    retry_count = job.retry_count + 1,
                    "Retry budget exhausted, job failed"
                );
            }
            Ok(state) => {
                tracing::info!(state = %state, "Job requeued for retry");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to record handler failure");
            }
        }
    }
}
