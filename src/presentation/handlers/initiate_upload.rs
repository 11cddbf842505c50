use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::application::services::UploadError;
use crate::presentation::state::AppState;

use super::ErrorResponse;

#[derive(Deserialize)]
pub struct InitiateUploadRequest {
    pub file_name: String,
    pub file_size: u64,
}

#[derive(Serialize)]
pub struct InitiateUploadResponse {
    pub job_id: String,
    pub upload_id: String,
    pub key: String,
    pub part_urls: Vec<String>,
}

#[tracing::instrument(skip(state, request))]
pub async fn initiate_upload_handler(
    State(state): State<AppState>,
    Json(request): Json<InitiateUploadRequest>,
) -> impl IntoResponse {
    match state
        .orchestrator
        .initiate(&request.file_name, request.file_size)
        .await
    {
        Ok(initiated) => (
            StatusCode::CREATED,
            Json(InitiateUploadResponse {
                job_id: initiated.job_id.to_string(),
                upload_id: initiated.upload_id,
                key: initiated.key.to_string(),
                part_urls: initiated.part_urls,
            }),
        )
            .into_response(),
        Err(e @ (UploadError::InvalidFileSize | UploadError::TooManyParts(_))) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initiate upload");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Failed to initiate upload: {}", e),
                }),
            )
                .into_response()
        }
    }
}
