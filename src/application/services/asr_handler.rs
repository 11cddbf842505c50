use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::application::ports::{
    AsrProvider, ObjectStoreGateway, TranscribeOptions, TranscriptRepository,
};
use crate::domain::{Job, StorageKey, Transcript};

use super::handler::{HandlerError, StageOutcome};

/// Consumes `Stage::Asr`: download the audio artifact, run the configured
/// speech-to-text provider under a bounded timeout, persist the raw response
/// and the cleaned text, insert the Transcript row.
pub struct AsrHandler {
    gateway: Arc<dyn ObjectStoreGateway>,
    provider: Arc<dyn AsrProvider>,
    transcript_repository: Arc<dyn TranscriptRepository>,
    timeout: Duration,
}

impl AsrHandler {
    pub fn new(
        gateway: Arc<dyn ObjectStoreGateway>,
        provider: Arc<dyn AsrProvider>,
        transcript_repository: Arc<dyn TranscriptRepository>,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            provider,
            transcript_repository,
            timeout,
        }
    }

    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, provider = self.provider.name()))]
    pub async fn handle(&self, job: &Job) -> Result<StageOutcome, HandlerError> {
        let audio_key = job
            .meta_str(Job::META_AUDIO_KEY)
            .map(StorageKey::from_raw)
            .ok_or(HandlerError::MissingMeta(Job::META_AUDIO_KEY))?;

        let audio = self
            .gateway
            .get_object(&audio_key)
            .await
            .map_err(HandlerError::Storage)?;

        tracing::debug!(bytes = audio.len(), "Audio artifact downloaded, transcribing");

        let transcription = tokio::time::timeout(
            self.timeout,
            self.provider.transcribe(&audio, &TranscribeOptions::default()),
        )
        .await
        .map_err(|_| HandlerError::Timeout(self.timeout))?
        .map_err(HandlerError::Provider)?;

        let raw_key = StorageKey::raw_transcript(job.id);
        let text_key = StorageKey::text_transcript(job.id);

        let raw_bytes = serde_json::to_vec(&transcription.raw_response)
            .unwrap_or_else(|_| b"{}".to_vec());
        self.gateway
            .put_object(&raw_key, raw_bytes)
            .await
            .map_err(HandlerError::Storage)?;
        self.gateway
            .put_object(&text_key, transcription.text.into_bytes())
            .await
            .map_err(HandlerError::Storage)?;

        let transcript = Transcript::new(
            job.id,
            self.provider.name().to_string(),
            raw_key,
            text_key,
            transcription.model_meta,
        );
        self.transcript_repository
            .insert(&transcript)
            .await
            .map_err(HandlerError::Repository)?;

        tracing::info!(transcript_id = %transcript.id.as_uuid(), "Transcript persisted");

        Ok(StageOutcome::Complete {
            meta_patch: json!({ Job::META_PROVIDER: self.provider.name() }),
        })
    }
}
