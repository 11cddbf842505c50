use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{JobId, JobState, StorageKey};
use crate::presentation::state::AppState;

use super::ErrorResponse;

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub id: String,
    pub state: String,
    pub stage: String,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Presigned link to the plain-text transcript, present once the job is
    /// done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_url: Option<String>,
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
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

    let job = match state.job_repository.get_by_id(JobId::from_uuid(uuid)).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Job not found: {}", job_id),
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job status");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to fetch job: {}", e),
                }),
            )
                .into_response();
        }
    };

    let transcript_url = if job.state == JobState::Done {
        let key = StorageKey::text_transcript(job.id);
        match state
            .gateway
            .presign_get_url(&key, state.settings.storage.download_url_ttl())
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to presign transcript download");
                None
            }
        }
    } else {
        None
    };

    let response = JobStatusResponse {
        id: job.id.to_string(),
        state: job.state.as_str().to_string(),
        stage: job.stage.as_str().to_string(),
        retry_count: job.retry_count,
        error_message: job.error_message,
        created_at: job.created_at.to_rfc3339(),
        updated_at: job.updated_at.to_rfc3339(),
        transcript_url,
    };
    (StatusCode::OK, Json(response)).into_response()
}
