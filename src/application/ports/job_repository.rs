use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Job, JobId, JobState, Stage};

use super::RepositoryError;

/// Persistence contract for the job table — the single source of truth all
/// pipeline components read and write.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Queued jobs, oldest first.
    async fn list_eligible(&self, limit: i64) -> Result<Vec<Job>, RepositoryError>;

    /// Atomically transition a job from `Queued` to `Processing`.
    ///
    /// Returns `false` when the row was no longer queued at the moment of the
    /// write, i.e. another worker won the race. This compare-and-swap is the
    /// only cross-worker coordination in the pipeline.
    async fn claim(&self, id: JobId) -> Result<bool, RepositoryError>;

    /// Transition `Processing` -> `Queued` at the next stage, shallow-merging
    /// `meta_patch` into the job's meta.
    async fn advance(
        &self,
        id: JobId,
        next_stage: Stage,
        meta_patch: Value,
    ) -> Result<(), RepositoryError>;

    /// Transition `Processing` -> `Done` with stage `AsrCompleted`.
    async fn finish(&self, id: JobId, meta_patch: Value) -> Result<(), RepositoryError>;

    /// Record one handler failure in a single conditional update: increments
    /// `retry_count`, requeues the same stage while the budget allows, moves
    /// the job to `Failed` once `retry_count` reaches `max_retries`.
    ///
    /// Returns the state the job ended up in.
    async fn record_failure(
        &self,
        id: JobId,
        error: &str,
        max_retries: i32,
    ) -> Result<JobState, RepositoryError>;

    /// Requeue jobs stuck in `Processing` whose `updated_at` is older than
    /// `older_than` — the recovery path for workers that crashed mid-stage.
    /// Does not touch `retry_count`. Returns the number of jobs requeued.
    async fn requeue_stale(&self, older_than: Duration) -> Result<u64, RepositoryError>;
}
