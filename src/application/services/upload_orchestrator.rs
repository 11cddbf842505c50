use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;

use crate::application::ports::{
    JobRepository, ObjectStoreGateway, RepositoryError, StorageError, UploadedPart,
};
use crate::domain::{Job, JobId, StorageKey};

const DEFAULT_EXTENSION: &str = "bin";

/// S3 rejects multipart uploads with more parts than this.
const MAX_PARTS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct InitiatedUpload {
    pub job_id: JobId,
    pub upload_id: String,
    pub key: StorageKey,
    pub part_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FinalizedUpload {
    pub job_id: JobId,
    /// True when the object was already in storage and the call had nothing
    /// left to do — a duplicate finalize from a network retry or double-click.
    pub already_completed: bool,
}

#[derive(Clone)]
struct UploadSession {
    key: StorageKey,
    upload_id: String,
}

/// Creates upload jobs, mints per-part presigned URLs and finalizes uploads
/// idempotently. The only component that creates Job rows.
pub struct UploadOrchestrator {
    gateway: Arc<dyn ObjectStoreGateway>,
    job_repository: Arc<dyn JobRepository>,
    part_size: u64,
    presign_ttl: Duration,
    // In-flight sessions by job id. Losing this map (process restart) is
    // recoverable: finalize falls back to listing storage under the job
    // prefix to find the object or the open multipart session.
    sessions: Mutex<HashMap<JobId, UploadSession>>,
}

impl UploadOrchestrator {
    pub fn new(
        gateway: Arc<dyn ObjectStoreGateway>,
        job_repository: Arc<dyn JobRepository>,
        part_size: u64,
        presign_ttl: Duration,
    ) -> Self {
        Self {
            gateway,
            job_repository,
            part_size,
            presign_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn initiate(
        &self,
        file_name: &str,
        file_size: u64,
    ) -> Result<InitiatedUpload, UploadError> {
        if file_size == 0 {
            return Err(UploadError::InvalidFileSize);
        }
        let part_count = file_size.div_ceil(self.part_size);
        if part_count > MAX_PARTS {
            return Err(UploadError::TooManyParts(part_count));
        }

        let job_id = JobId::new();
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_EXTENSION);
        let key = StorageKey::original(job_id, extension);

        let upload_id = self
            .gateway
            .create_multipart_upload(&key)
            .await
            .map_err(UploadError::Storage)?;

        let mut part_urls = Vec::with_capacity(part_count as usize);
        for part_number in 1..=part_count as i32 {
            let url = self
                .gateway
                .presign_part_url(&key, &upload_id, part_number, self.presign_ttl)
                .await
                .map_err(UploadError::Storage)?;
            part_urls.push(url);
        }

        self.sessions.lock().await.insert(
            job_id,
            UploadSession {
                key: key.clone(),
                upload_id: upload_id.clone(),
            },
        );

        tracing::info!(
            job_id = %job_id,
            key = %key,
            parts = part_count,
            "Multipart upload initiated"
        );

        Ok(InitiatedUpload {
            job_id,
            upload_id,
            key,
            part_urls,
        })
    }

    /// Idempotent: a finalize for an object that already exists returns the
    /// same success as the first call and never creates a second Job row.
    #[tracing::instrument(skip(self, parts), fields(job_id = %job_id))]
    pub async fn finalize(
        &self,
        job_id: JobId,
        parts: &[UploadedPart],
    ) -> Result<FinalizedUpload, UploadError> {
        let prefix = StorageKey::prefix(job_id);
        let session = self.sessions.lock().await.get(&job_id).cloned();

        // Already completed? Head the known key, or list under the job
        // prefix when the session was lost.
        let existing = match &session {
            Some(s) => self
                .gateway
                .head_object(&s.key)
                .await
                .map_err(UploadError::Storage)?
                .map(|_| s.key.clone()),
            None => self
                .gateway
                .find_object(&prefix)
                .await
                .map_err(UploadError::Storage)?,
        };
        if let Some(key) = existing {
            tracing::info!(key = %key, "Finalize called for already-completed upload");
            return Ok(FinalizedUpload {
                job_id,
                already_completed: true,
            });
        }

        let (key, upload_id) = match session {
            Some(s) => (s.key, s.upload_id),
            None => self
                .gateway
                .find_active_upload(&prefix)
                .await
                .map_err(UploadError::Storage)?
                .ok_or(UploadError::SessionNotFound(job_id))?,
        };

        self.gateway
            .complete_multipart_upload(&key, &upload_id, parts)
            .await
            .map_err(UploadError::Storage)?;

        let job = Job::new(job_id, json!({ Job::META_SOURCE_KEY: key.as_str() }));
        self.job_repository
            .create(&job)
            .await
            .map_err(UploadError::Repository)?;

        self.sessions.lock().await.remove(&job_id);

        tracing::info!(key = %key, "Upload finalized, job queued for transcode");

        Ok(FinalizedUpload {
            job_id,
            already_completed: false,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file size must be positive")]
    InvalidFileSize,
    #[error("upload would span {0} parts, over the multipart limit of 10000")]
    TooManyParts(u64),
    #[error("no upload session or object found for job {0}")]
    SessionNotFound(JobId),
    #[error("storage: {0}")]
    Storage(StorageError),
    #[error("repository: {0}")]
    Repository(RepositoryError),
}
