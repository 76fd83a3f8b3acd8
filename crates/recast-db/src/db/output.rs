use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use recast_core::models::{NewOutput, Output};

const OUTPUT_COLUMNS: &str = r#"
    id,
    job_id,
    content_type,
    content,
    storage_locator,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct OutputRepository {
    pool: PgPool,
}

impl OutputRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one output for a (job, content type) pair.
    ///
    /// Append-only and idempotent: a second insert for the same pair hits the
    /// unique index, inserts nothing, and returns `None` so the caller knows
    /// the artifact already exists. The job's updated_at is bumped in the
    /// same transaction.
    #[tracing::instrument(skip(self, output), fields(job_id = %output.job_id, content_type = %output.content_type))]
    pub async fn append_output(&self, output: &NewOutput) -> Result<Option<Output>> {
        let (content, storage_locator) = output.columns();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for output append")?;

        let inserted: Option<Output> = sqlx::query_as::<Postgres, Output>(&format!(
            r#"
            INSERT INTO content_outputs (job_id, content_type, content, storage_locator)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_id, content_type) DO NOTHING
            RETURNING {OUTPUT_COLUMNS}
            "#,
        ))
        .bind(output.job_id)
        .bind(output.content_type.to_string())
        .bind(content)
        .bind(storage_locator)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to insert output")?;

        sqlx::query("UPDATE jobs SET updated_at = NOW() WHERE id = $1")
            .bind(output.job_id)
            .execute(&mut *tx)
            .await
            .context("Failed to bump job updated_at")?;

        tx.commit()
            .await
            .context("Failed to commit output append")?;

        match &inserted {
            Some(row) => {
                tracing::info!(output_id = %row.id, "Output appended");
            }
            None => {
                tracing::debug!("Output already present, append skipped");
            }
        }

        Ok(inserted)
    }

    /// List all outputs produced for a job.
    #[tracing::instrument(skip(self))]
    pub async fn list_outputs(&self, job_id: Uuid) -> Result<Vec<Output>> {
        let outputs = sqlx::query_as::<Postgres, Output>(&format!(
            r#"
            SELECT {OUTPUT_COLUMNS}
            FROM content_outputs
            WHERE job_id = $1
            ORDER BY created_at ASC
            "#,
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list outputs")?;

        Ok(outputs)
    }
}

#[async_trait::async_trait]
impl crate::store_traits::OutputStore for OutputRepository {
    async fn append(&self, output: &NewOutput) -> Result<Option<Output>> {
        self.append_output(output).await
    }

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<Output>> {
        self.list_outputs(job_id).await
    }
}
