use async_trait::async_trait;

/// External audio-extraction operation used by the transcode stage: takes the
/// raw uploaded media, produces a compressed audio artifact suitable for the
/// ASR backends.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, media: &[u8], source_ext: &str) -> Result<Vec<u8>, ExtractorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("extraction process failed: {0}")]
    ProcessFailed(String),
    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
