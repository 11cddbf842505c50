use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{JobId, StorageKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranscriptId(Uuid);

impl TranscriptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TranscriptId {
    fn default() -> Self {
        Self::new()
    }
}

/// Output record of a completed speech-recognition stage.
///
/// Insert-only: a retried ASR attempt creates a new row rather than mutating
/// an old one, keeping an audit trail of attempts.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub id: TranscriptId,
    pub job_id: JobId,
    pub provider: String,
    pub raw_artifact_key: StorageKey,
    pub text_artifact_key: StorageKey,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    pub fn new(
        job_id: JobId,
        provider: String,
        raw_artifact_key: StorageKey,
        text_artifact_key: StorageKey,
        meta: Value,
    ) -> Self {
        Self {
            id: TranscriptId::new(),
            job_id,
            provider,
            raw_artifact_key,
            text_artifact_key,
            meta,
            created_at: Utc::now(),
        }
    }
}
