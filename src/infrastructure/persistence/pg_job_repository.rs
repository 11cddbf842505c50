use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{Job, JobId, JobState, Stage};

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    state: String,
    stage: String,
    retry_count: i32,
    meta: Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(r: JobRow) -> Result<Self, Self::Error> {
        let state = JobState::from_str(&r.state).map_err(RepositoryError::QueryFailed)?;
        let stage = Stage::from_str(&r.stage).map_err(RepositoryError::QueryFailed)?;
        Ok(Job {
            id: JobId::from_uuid(r.id),
            state,
            stage,
            retry_count: r.retry_count,
            meta: r.meta,
            error_message: r.error_message,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, state, stage, retry_count, meta, error_message, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.state.as_str())
        .bind(job.stage.as_str())
        .bind(job.retry_count)
        .bind(&job.meta)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, state, stage, retry_count, meta, error_message, created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(Job::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_eligible(&self, limit: i64) -> Result<Vec<Job>, RepositoryError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, state, stage, retry_count, meta, error_message, created_at, updated_at
            FROM jobs
            WHERE state = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(JobState::Queued.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.into_iter().map(Job::try_from).collect()
    }

    // The claim only succeeds when the row is still QUEUED at the moment of
    // the write; zero rows affected means another worker won the race.
    #[instrument(skip(self), fields(job_id = %id))]
    async fn claim(&self, id: JobId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = $1, updated_at = $2
            WHERE id = $3 AND state = $4
            "#,
        )
        .bind(JobState::Processing.as_str())
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(JobState::Queued.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, meta_patch), fields(job_id = %id, next_stage = %next_stage))]
    async fn advance(
        &self,
        id: JobId,
        next_stage: Stage,
        meta_patch: Value,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = $1, stage = $2, meta = meta || $3, error_message = NULL, updated_at = $4
            WHERE id = $5 AND state = $6
            "#,
        )
        .bind(JobState::Queued.as_str())
        .bind(next_stage.as_str())
        .bind(meta_patch)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(JobState::Processing.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "job {} is not processing",
                id
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, meta_patch), fields(job_id = %id))]
    async fn finish(&self, id: JobId, meta_patch: Value) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = $1, stage = $2, meta = meta || $3, error_message = NULL, updated_at = $4
            WHERE id = $5 AND state = $6
            "#,
        )
        .bind(JobState::Done.as_str())
        .bind(Stage::AsrCompleted.as_str())
        .bind(meta_patch)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(JobState::Processing.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "job {} is not processing",
                id
            )));
        }
        Ok(())
    }

    // One statement so concurrent callers can never double-count a failure.
    #[instrument(skip(self, error), fields(job_id = %id))]
    async fn record_failure(
        &self,
        id: JobId,
        error: &str,
        max_retries: i32,
    ) -> Result<JobState, RepositoryError> {
        let state: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE jobs
            SET retry_count = retry_count + 1,
                state = CASE WHEN retry_count + 1 >= $1 THEN 'FAILED' ELSE 'QUEUED' END,
                error_message = $2,
                updated_at = $3
            WHERE id = $4 AND state = $5
            RETURNING state
            "#,
        )
        .bind(max_retries)
        .bind(error)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(JobState::Processing.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        match state {
            Some((s,)) => JobState::from_str(&s).map_err(RepositoryError::QueryFailed),
            None => Err(RepositoryError::Conflict(format!(
                "job {} is not processing",
                id
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn requeue_stale(&self, older_than: Duration) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - older_than;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = $1, updated_at = $2
            WHERE state = $3 AND updated_at < $4
            "#,
        )
        .bind(JobState::Queued.as_str())
        .bind(Utc::now())
        .bind(JobState::Processing.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
