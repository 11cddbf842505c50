use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::{AudioExtractor, ExtractorError};

/// Shells out to ffmpeg to strip the video track and downmix the audio to
/// mono 16 kHz mp3, the cheapest format the Whisper backends accept.
pub struct FfmpegExtractor {
    binary: String,
}

impl FfmpegExtractor {
    pub fn new(binary: Option<String>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| "ffmpeg".to_string()),
        }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, media: &[u8], source_ext: &str) -> Result<Vec<u8>, ExtractorError> {
        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join(format!("input.{}", source_ext));
        let output_path = workdir.path().join("output.mp3");

        tokio::fs::write(&input_path, media).await?;

        let output = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(&input_path)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-b:a", "64k"])
            .arg(&output_path)
            .output()
            .await
            .map_err(|e| ExtractorError::ProcessFailed(format!("spawn {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // ffmpeg reports missing/garbled streams on stderr.
            if stderr.contains("Invalid data") || stderr.contains("does not contain any stream") {
                return Err(ExtractorError::UnsupportedMedia(stderr.into_owned()));
            }
            return Err(ExtractorError::ProcessFailed(stderr.into_owned()));
        }

        let audio = tokio::fs::read(&output_path).await?;
        tracing::debug!(
            input_bytes = media.len(),
            output_bytes = audio.len(),
            "Audio extracted"
        );
        Ok(audio)
    }
}
