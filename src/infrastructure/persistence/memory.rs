use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::application::ports::{
    JobRepository, RepositoryError, TranscriptRepository,
};
use crate::domain::{Job, JobId, JobState, Stage, Transcript};

fn merge_meta(meta: &mut Value, patch: &Value) {
    if let (Some(base), Some(patch)) = (meta.as_object_mut(), patch.as_object()) {
        for (k, v) in patch {
            base.insert(k.clone(), v.clone());
        }
    }
}

/// In-memory job store with the same conditional-update semantics as the
/// Postgres adapter. Used by tests and scaffold mode; the claim is a real
/// compare-and-swap under the map lock, so the at-most-one-claim property
/// holds for concurrent tasks exactly as it does for concurrent processes.
#[derive(Default)]
pub struct MemoryJobRepository {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock().expect("jobs lock");
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::Conflict(format!(
                "job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.lock().expect("jobs lock").get(&id).cloned())
    }

    async fn list_eligible(&self, limit: i64) -> Result<Vec<Job>, RepositoryError> {
        let jobs = self.jobs.lock().expect("jobs lock");
        let mut eligible: Vec<Job> = jobs
            .values()
            .filter(|j| j.state == JobState::Queued)
            .cloned()
            .collect();
        eligible.sort_by_key(|j| j.created_at);
        eligible.truncate(limit as usize);
        Ok(eligible)
    }

    async fn claim(&self, id: JobId) -> Result<bool, RepositoryError> {
        let mut jobs = self.jobs.lock().expect("jobs lock");
        match jobs.get_mut(&id) {
            Some(job) if job.state == JobState::Queued => {
                job.state = JobState::Processing;
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn advance(
        &self,
        id: JobId,
        next_stage: Stage,
        meta_patch: Value,
    ) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock().expect("jobs lock");
        match jobs.get_mut(&id) {
            Some(job) if job.state == JobState::Processing => {
                job.state = JobState::Queued;
                job.stage = next_stage;
                merge_meta(&mut job.meta, &meta_patch);
                job.error_message = None;
                job.updated_at = Utc::now();
                Ok(())
            }
            Some(_) => Err(RepositoryError::Conflict(format!(
                "job {} is not processing",
                id
            ))),
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn finish(&self, id: JobId, meta_patch: Value) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock().expect("jobs lock");
        match jobs.get_mut(&id) {
            Some(job) if job.state == JobState::Processing => {
                job.state = JobState::Done;
                job.stage = Stage::AsrCompleted;
                merge_meta(&mut job.meta, &meta_patch);
                job.error_message = None;
                job.updated_at = Utc::now();
                Ok(())
            }
            Some(_) => Err(RepositoryError::Conflict(format!(
                "job {} is not processing",
                id
            ))),
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn record_failure(
        &self,
        id: JobId,
        error: &str,
        max_retries: i32,
    ) -> Result<JobState, RepositoryError> {
        let mut jobs = self.jobs.lock().expect("jobs lock");
        match jobs.get_mut(&id) {
            Some(job) if job.state == JobState::Processing => {
                job.retry_count += 1;
                job.state = if job.retry_count >= max_retries {
                    JobState::Failed
                } else {
                    JobState::Queued
                };
                job.error_message = Some(error.to_string());
                job.updated_at = Utc::now();
                Ok(job.state)
            }
            Some(_) => Err(RepositoryError::Conflict(format!(
                "job {} is not processing",
                id
            ))),
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn requeue_stale(&self, older_than: Duration) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - older_than;
        let mut jobs = self.jobs.lock().expect("jobs lock");
        let mut swept = 0;
        for job in jobs.values_mut() {
            if job.state == JobState::Processing && job.updated_at < cutoff {
                job.state = JobState::Queued;
                job.updated_at = Utc::now();
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[derive(Default)]
pub struct MemoryTranscriptRepository {
    transcripts: Mutex<Vec<Transcript>>,
}

impl MemoryTranscriptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptRepository for MemoryTranscriptRepository {
    async fn insert(&self, transcript: &Transcript) -> Result<(), RepositoryError> {
        self.transcripts
            .lock()
            .expect("transcripts lock")
            .push(transcript.clone());
        Ok(())
    }

    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<Transcript>, RepositoryError> {
        let mut rows: Vec<Transcript> = self
            .transcripts
            .lock()
            .expect("transcripts lock")
            .iter()
            .filter(|t| t.job_id == job_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
