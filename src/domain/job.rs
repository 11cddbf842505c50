use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{JobId, JobState, Stage};

/// One multipart-upload-to-transcript pipeline instance.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub stage: Stage,
    pub retry_count: i32,
    /// Open attribute bag for stage-specific artifacts: storage keys produced
    /// by earlier stages, the active ASR provider name, diagnostics.
    pub meta: Value,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub const META_SOURCE_KEY: &'static str = "source_key";
    pub const META_AUDIO_KEY: &'static str = "audio_key";
    pub const META_PROVIDER: &'static str = "provider";

    pub fn new(id: JobId, meta: Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: JobState::Queued,
            stage: Stage::Transcode,
            retry_count: 0,
            meta,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}
