use std::time::Duration;

use serde_json::Value;

use crate::application::ports::{ExtractorError, ProviderError, RepositoryError, StorageError};
use crate::domain::Stage;

/// What a stage handler produced: either the job moves on to `next` stage, or
/// the pipeline is complete. `meta_patch` is shallow-merged into the job's
/// meta by the worker when it applies the transition.
#[derive(Debug)]
pub enum StageOutcome {
    Advance { next: Stage, meta_patch: Value },
    Complete { meta_patch: Value },
}

/// Any failure inside a stage handler counts as exactly one handler failure
/// for retry purposes, whatever step it happened in.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("storage: {0}")]
    Storage(StorageError),
    #[error("audio extraction: {0}")]
    Extraction(ExtractorError),
    #[error("asr provider: {0}")]
    Provider(ProviderError),
    #[error("asr provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("repository: {0}")]
    Repository(RepositoryError),
    #[error("job meta missing field: {0}")]
    MissingMeta(&'static str),
}
