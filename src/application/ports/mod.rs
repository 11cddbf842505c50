mod asr_provider;
mod audio_extractor;
mod job_repository;
mod object_store_gateway;
mod repository_error;
mod transcript_repository;

pub use asr_provider::{AsrProvider, ProviderError, TranscribeOptions, Transcription};
pub use audio_extractor::{AudioExtractor, ExtractorError};
pub use job_repository::JobRepository;
pub use object_store_gateway::{ObjectMeta, ObjectStoreGateway, StorageError, UploadedPart};
pub use repository_error::RepositoryError;
pub use transcript_repository::TranscriptRepository;
