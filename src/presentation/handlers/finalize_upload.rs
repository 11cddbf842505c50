use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::UploadedPart;
use crate::application::services::UploadError;
use crate::domain::JobId;
use crate::presentation::state::AppState;

use super::ErrorResponse;

#[derive(Deserialize)]
pub struct FinalizePart {
    pub part_number: i32,
    pub e_tag: String,
}

#[derive(Deserialize)]
pub struct FinalizeUploadRequest {
    pub parts: Vec<FinalizePart>,
}

#[derive(Serialize)]
pub struct FinalizeUploadResponse {
    pub status: String,
    pub job_id: String,
}

#[tracing::instrument(skip(state, request))]
pub async fn finalize_upload_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<FinalizeUploadRequest>,
) -> impl IntoResponse {
    let uuid = match Uuid::parse_str(&job_id) {
        Ok(u) => u,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid job ID: {}", job_id),
                }),
            )
                .into_response();
        }
    };

    let parts: Vec<UploadedPart> = request
        .parts
        .into_iter()
        .map(|p| UploadedPart {
            part_number: p.part_number,
            e_tag: p.e_tag,
        })
        .collect();

    match state
        .orchestrator
        .finalize(JobId::from_uuid(uuid), &parts)
        .await
    {
        Ok(finalized) => {
            let status = if finalized.already_completed {
                "already_completed"
            } else {
                "queued"
            };
            (
                StatusCode::OK,
                Json(FinalizeUploadResponse {
                    status: status.to_string(),
                    job_id: finalized.job_id.to_string(),
                }),
            )
                .into_response()
        }
        Err(UploadError::SessionNotFound(id)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No upload session found for job {}", id),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to finalize upload");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Failed to finalize upload: {}", e),
                }),
            )
                .into_response()
        }
    }
}
