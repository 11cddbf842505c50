mod finalize_upload;
mod health;
mod initiate_upload;
mod job_status;

use serde::Serialize;

pub use finalize_upload::{FinalizeUploadRequest, FinalizeUploadResponse, finalize_upload_handler};
pub use health::health_handler;
pub use initiate_upload::{
    InitiateUploadRequest, InitiateUploadResponse, initiate_upload_handler,
};
pub use job_status::{JobStatusResponse, job_status_handler};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
