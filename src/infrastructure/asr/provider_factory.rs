use std::sync::Arc;

use crate::application::ports::{AsrProvider, ProviderError};
use crate::presentation::config::{AsrProviderSetting, AsrSettings};

use super::azure_whisper::AzureWhisperProvider;
use super::openai_whisper::OpenAiWhisperProvider;

/// Builds the configured speech-to-text backend once at startup; the
/// pipeline holds it as an immutable `Arc<dyn AsrProvider>` for the process
/// lifetime.
pub struct AsrProviderFactory;

impl AsrProviderFactory {
    pub fn create(settings: &AsrSettings) -> Result<Arc<dyn AsrProvider>, ProviderError> {
        match settings.provider {
            AsrProviderSetting::OpenAi => {
                let api_key = settings.api_key.clone().ok_or_else(|| {
                    ProviderError::Configuration("api_key required for OpenAI Whisper".to_string())
                })?;
                Ok(Arc::new(OpenAiWhisperProvider::new(
                    api_key,
                    settings.base_url.clone(),
                    settings.model.clone(),
                )))
            }
            AsrProviderSetting::Azure => {
                let base_url = settings.base_url.as_deref().ok_or_else(|| {
                    ProviderError::Configuration("base_url required for Azure Whisper".to_string())
                })?;
                let deployment = settings.deployment.as_deref().ok_or_else(|| {
                    ProviderError::Configuration(
                        "deployment required for Azure Whisper".to_string(),
                    )
                })?;
                let api_key = settings.api_key.as_deref().ok_or_else(|| {
                    ProviderError::Configuration("api_key required for Azure Whisper".to_string())
                })?;
                let api_version = settings
                    .api_version
                    .as_deref()
                    .unwrap_or("2024-06-01");
                Ok(Arc::new(AzureWhisperProvider::new(
                    base_url, deployment, api_key, api_version,
                )))
            }
        }
    }
}
