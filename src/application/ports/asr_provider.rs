use async_trait::async_trait;
use serde_json::Value;

/// Options passed through to the speech-to-text backend.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// BCP-47 language hint, when the caller knows it.
    pub language: Option<String>,
}

/// What a provider hands back: the untouched backend response for the audit
/// artifact, the cleaned plain text, and whatever the backend reports about
/// itself (model identifier, confidence flags).
#[derive(Debug, Clone)]
pub struct Transcription {
    pub raw_response: Value,
    pub text: String,
    pub model_meta: Value,
}

/// Uniform contract over interchangeable speech-to-text backends.
///
/// The ASR stage handler is unaware which provider is active; adding a
/// backend means implementing this trait and wiring it into the factory,
/// nothing else.
#[async_trait]
pub trait AsrProvider: Send + Sync {
    /// Stable name recorded on Transcript rows.
    fn name(&self) -> &'static str;

    async fn transcribe(
        &self,
        audio: &[u8],
        options: &TranscribeOptions,
    ) -> Result<Transcription, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("provider configuration: {0}")]
    Configuration(String),
}
