use async_trait::async_trait;
use reqwest::multipart;
use serde_json::{Value, json};

use crate::application::ports::{AsrProvider, ProviderError, TranscribeOptions, Transcription};

pub struct AzureWhisperProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    deployment: String,
}

impl AzureWhisperProvider {
    pub fn new(base_url: &str, deployment: &str, api_key: &str, api_version: &str) -> Self {
        let endpoint = format!(
            "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
            base_url.trim_end_matches('/'),
            deployment,
            api_version,
        );
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: api_key.to_string(),
            deployment: deployment.to_string(),
        }
    }
}

#[async_trait]
impl AsrProvider for AzureWhisperProvider {
    fn name(&self) -> &'static str {
        "azure_whisper"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        options: &TranscribeOptions,
    ) -> Result<Transcription, ProviderError> {
        let file_part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")
            .map_err(|e| ProviderError::ApiRequestFailed(format!("mime: {}", e)))?;

        let mut form = multipart::Form::new()
            .text("response_format", "verbose_json")
            .part("file", file_part);
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }

        tracing::debug!(endpoint = %self.endpoint, "Sending audio to Azure OpenAI Whisper");

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::ApiRequestFailed(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::ApiRequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("parse response: {}", e)))?;

        let text = raw
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::MalformedResponse("no text field".to_string()))?
            .trim()
            .to_string();

        tracing::info!(chars = text.len(), "Azure OpenAI Whisper transcription completed");

        let model_meta = json!({
            "deployment": self.deployment,
            "language": raw.get("language").cloned().unwrap_or(Value::Null),
            "duration": raw.get("duration").cloned().unwrap_or(Value::Null),
        });

        Ok(Transcription {
            raw_response: raw,
            text,
            model_meta,
        })
    }
}
