use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{RepositoryError, TranscriptRepository};
use crate::domain::{JobId, StorageKey, Transcript, TranscriptId};

pub struct PgTranscriptRepository {
    pool: PgPool,
}

impl PgTranscriptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TranscriptRow {
    id: Uuid,
    job_id: Uuid,
    provider: String,
    raw_artifact_key: String,
    text_artifact_key: String,
    meta: Value,
    created_at: DateTime<Utc>,
}

impl From<TranscriptRow> for Transcript {
    fn from(r: TranscriptRow) -> Self {
        Transcript {
            id: TranscriptId::from_uuid(r.id),
            job_id: JobId::from_uuid(r.job_id),
            provider: r.provider,
            raw_artifact_key: StorageKey::from_raw(r.raw_artifact_key),
            text_artifact_key: StorageKey::from_raw(r.text_artifact_key),
            meta: r.meta,
            created_at: r.created_at,
        }
    }
}

#[async_trait]
impl TranscriptRepository for PgTranscriptRepository {
    #[instrument(skip(self, transcript), fields(transcript_id = %transcript.id.as_uuid(), job_id = %transcript.job_id))]
    async fn insert(&self, transcript: &Transcript) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO transcripts (id, job_id, provider, raw_artifact_key, text_artifact_key, meta, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(transcript.id.as_uuid())
        .bind(transcript.job_id.as_uuid())
        .bind(&transcript.provider)
        .bind(transcript.raw_artifact_key.as_str())
        .bind(transcript.text_artifact_key.as_str())
        .bind(&transcript.meta)
        .bind(transcript.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<Transcript>, RepositoryError> {
        let rows = sqlx::query_as::<_, TranscriptRow>(
            r#"
            SELECT id, job_id, provider, raw_artifact_key, text_artifact_key, meta, created_at
            FROM transcripts
            WHERE job_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(job_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(rows.into_iter().map(Transcript::from).collect())
    }
}
