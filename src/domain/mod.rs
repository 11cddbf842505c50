mod job;
mod job_id;
mod job_state;
mod stage;
mod storage_key;
mod transcript;

pub use job::Job;
pub use job_id::JobId;
pub use job_state::JobState;
pub use stage::Stage;
pub use storage_key::StorageKey;
pub use transcript::{Transcript, TranscriptId};
