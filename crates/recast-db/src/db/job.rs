use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use recast_core::models::{Job, NewJob};

const JOB_COLUMNS: &str = r#"
    id,
    title,
    original_content,
    content_types,
    options,
    status,
    error_message,
    created_at,
    updated_at,
    completed_at
"#;

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new job in pending state (called by the submission gateway).
    #[tracing::instrument(skip(self, new_job), fields(title = %new_job.title))]
    pub async fn create_job(&self, new_job: &NewJob) -> Result<Job> {
        let content_types: Vec<String> = new_job
            .content_types
            .iter()
            .map(|ct| ct.to_string())
            .collect();
        let options =
            serde_json::to_value(&new_job.options).context("Failed to serialize options")?;

        let job: Job = sqlx::query_as::<Postgres, Job>(&format!(
            r#"
            INSERT INTO jobs (title, original_content, content_types, options, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(&new_job.title)
        .bind(&new_job.original_content)
        .bind(&content_types)
        .bind(options)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert job")?;

        tracing::info!(
            job_id = %job.id,
            content_types = ?content_types,
            "Job created"
        );

        Ok(job)
    }

    /// Get a job by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        let job: Option<Job> = sqlx::query_as::<Postgres, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE id = $1
            "#,
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch job")?;

        Ok(job)
    }

    /// Claim a job for processing with a conditional update on status.
    ///
    /// The pending -> processing transition acts as the ownership guard: the
    /// first worker to observe pending wins. A delivery that finds the job
    /// already processing gets the current row back and re-checks per-type
    /// completeness instead of restarting; a terminal row is returned
    /// unchanged so the caller can no-op.
    #[tracing::instrument(skip(self))]
    pub async fn begin_processing(&self, job_id: Uuid) -> Result<Job> {
        let claimed: Option<Job> = sqlx::query_as::<Postgres, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'processing',
                updated_at = NOW()
            WHERE id = $1
                AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to claim job for processing")?;

        if let Some(job) = claimed {
            tracing::debug!(job_id = %job.id, "Job claimed for processing");
            return Ok(job);
        }

        self.get_job(job_id)
            .await?
            .with_context(|| format!("Job {} not found", job_id))
    }

    /// Terminal transition: at least one artifact was produced.
    ///
    /// Guarded on the processing state so a terminal status is never
    /// regressed or overwritten; if the row was already terminal the current
    /// row is returned untouched.
    #[tracing::instrument(skip(self))]
    pub async fn mark_completed(&self, job_id: Uuid) -> Result<Job> {
        let updated: Option<Job> = sqlx::query_as::<Postgres, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'completed',
                error_message = NULL,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
                AND status = 'processing'
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mark job as completed")?;

        match updated {
            Some(job) => {
                tracing::info!(job_id = %job.id, "Job completed");
                Ok(job)
            }
            None => self
                .get_job(job_id)
                .await?
                .with_context(|| format!("Job {} not found", job_id)),
        }
    }

    /// Terminal transition: zero artifacts succeeded, or the task retry
    /// ceiling was exhausted. Records the human-readable reason.
    #[tracing::instrument(skip(self, error))]
    pub async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<Job> {
        let updated: Option<Job> = sqlx::query_as::<Postgres, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
                AND status IN ('pending', 'processing')
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mark job as failed")?;

        match updated {
            Some(job) => {
                tracing::error!(job_id = %job.id, error = %error, "Job failed");
                Ok(job)
            }
            None => self
                .get_job(job_id)
                .await?
                .with_context(|| format!("Job {} not found", job_id)),
        }
    }

    /// Bump updated_at after a failed artifact attempt.
    #[tracing::instrument(skip(self))]
    pub async fn touch(&self, job_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE jobs SET updated_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .context("Failed to touch job")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::store_traits::JobStore for JobRepository {
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        self.get_job(job_id).await
    }

    async fn begin_processing(&self, job_id: Uuid) -> Result<Job> {
        JobRepository::begin_processing(self, job_id).await
    }

    async fn mark_completed(&self, job_id: Uuid) -> Result<Job> {
        JobRepository::mark_completed(self, job_id).await
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<Job> {
        JobRepository::mark_failed(self, job_id, error).await
    }

    async fn touch(&self, job_id: Uuid) -> Result<()> {
        JobRepository::touch(self, job_id).await
    }
}
