mod asr_handler;
mod handler;
mod pipeline_worker;
mod transcode_handler;
mod upload_orchestrator;

pub use asr_handler::AsrHandler;
pub use handler::{HandlerError, StageOutcome};
pub use pipeline_worker::{PipelineWorker, WorkerConfig};
pub use transcode_handler::TranscodeHandler;
pub use upload_orchestrator::{FinalizedUpload, InitiatedUpload, UploadError, UploadOrchestrator};
