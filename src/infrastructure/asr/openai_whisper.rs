use async_trait::async_trait;
use reqwest::multipart;
use serde_json::{Value, json};

use crate::application::ports::{AsrProvider, ProviderError, TranscribeOptions, Transcription};

pub struct OpenAiWhisperProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiWhisperProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "whisper-1".to_string()),
        }
    }
}

#[async_trait]
impl AsrProvider for OpenAiWhisperProvider {
    fn name(&self) -> &'static str {
        "openai_whisper"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        options: &TranscribeOptions,
    ) -> Result<Transcription, ProviderError> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let file_part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")
            .map_err(|e| ProviderError::ApiRequestFailed(format!("mime: {}", e)))?;

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", file_part);
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }

        tracing::debug!(model = %self.model, "Sending audio to OpenAI Whisper API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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

        tracing::info!(chars = text.len(), "OpenAI Whisper transcription completed");

        let model_meta = json!({
            "model": self.model,
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
