use std::sync::Arc;

use serde_json::json;

use crate::application::ports::{AudioExtractor, ObjectStoreGateway};
use crate::domain::{Job, Stage, StorageKey};

use super::handler::{HandlerError, StageOutcome};

/// Consumes `Stage::Transcode`: download the uploaded media, extract a
/// compressed audio artifact, store it under the job's derived key.
pub struct TranscodeHandler {
    gateway: Arc<dyn ObjectStoreGateway>,
    extractor: Arc<dyn AudioExtractor>,
}

impl TranscodeHandler {
    pub fn new(gateway: Arc<dyn ObjectStoreGateway>, extractor: Arc<dyn AudioExtractor>) -> Self {
        Self { gateway, extractor }
    }

    #[tracing::instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn handle(&self, job: &Job) -> Result<StageOutcome, HandlerError> {
        let source_key = job
            .meta_str(Job::META_SOURCE_KEY)
            .map(StorageKey::from_raw)
            .ok_or(HandlerError::MissingMeta(Job::META_SOURCE_KEY))?;
        let source_ext = source_key
            .as_str()
            .rsplit('.')
            .next()
            .unwrap_or("bin")
            .to_string();

        let media = self
            .gateway
            .get_object(&source_key)
            .await
            .map_err(HandlerError::Storage)?;

        tracing::debug!(bytes = media.len(), "Source media downloaded, extracting audio");

        let audio = self
            .extractor
            .extract(&media, &source_ext)
            .await
            .map_err(HandlerError::Extraction)?;

        // Deterministic key: a retried attempt overwrites its own partial
        // output instead of orphaning it.
        let audio_key = StorageKey::audio_artifact(job.id);
        self.gateway
            .put_object(&audio_key, audio)
            .await
            .map_err(HandlerError::Storage)?;

        tracing::info!(audio_key = %audio_key, "Audio artifact stored");

        Ok(StageOutcome::Advance {
            next: Stage::Asr,
            meta_patch: json!({ Job::META_AUDIO_KEY: audio_key.as_str() }),
        })
    }
}
