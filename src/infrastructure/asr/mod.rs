mod azure_whisper;
mod openai_whisper;
mod provider_factory;

pub use azure_whisper::AzureWhisperProvider;
pub use openai_whisper::OpenAiWhisperProvider;
pub use provider_factory::AsrProviderFactory;
