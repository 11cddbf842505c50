use std::fmt;

use super::JobId;

/// Location of an object in the storage backend.
///
/// Every object belonging to a job lives under the deterministic prefix
/// `uploads/{job_id}/`, so derived artifacts from a retried stage overwrite
/// the previous attempt instead of orphaning it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn original(job_id: JobId, extension: &str) -> Self {
        Self(format!("{}original.{}", Self::prefix(job_id), extension))
    }

    pub fn audio_artifact(job_id: JobId) -> Self {
        Self(format!("{}audio.mp3", Self::prefix(job_id)))
    }

    pub fn raw_transcript(job_id: JobId) -> Self {
        Self(format!("{}transcript.raw.json", Self::prefix(job_id)))
    }

    pub fn text_transcript(job_id: JobId) -> Self {
        Self(format!("{}transcript.txt", Self::prefix(job_id)))
    }

    pub fn prefix(job_id: JobId) -> String {
        format!("uploads/{}/", job_id.as_uuid())
    }

    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
