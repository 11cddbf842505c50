use async_trait::async_trait;

use crate::domain::{JobId, Transcript};

use super::RepositoryError;

#[async_trait]
pub trait TranscriptRepository: Send + Sync {
    async fn insert(&self, transcript: &Transcript) -> Result<(), RepositoryError>;

    /// Transcripts for a job, newest first. Retried attempts accumulate as
    /// separate rows.
    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<Transcript>, RepositoryError>;
}
