use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use recast_core::constants::JOB_READY_CHANNEL;
use recast_core::models::Task;

const TASK_COLUMNS: &str = r#"
    id,
    job_id,
    status,
    retry_count,
    max_retries,
    timeout_seconds,
    last_error,
    scheduled_at,
    started_at,
    completed_at,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue one processing attempt for a job.
    ///
    /// Insert and NOTIFY happen in one transaction so workers wake
    /// immediately; a failed NOTIFY is non-fatal, pollers catch up.
    #[tracing::instrument(skip(self))]
    pub async fn enqueue(
        &self,
        job_id: Uuid,
        max_retries: i32,
        timeout_seconds: Option<i32>,
    ) -> Result<Task> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for task creation")?;

        let task: Task = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            INSERT INTO job_tasks (job_id, status, max_retries, timeout_seconds, scheduled_at)
            VALUES ($1, 'pending', $2, $3, NOW())
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .bind(max_retries)
        .bind(timeout_seconds)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert job task")?;

        if let Err(e) = sqlx::query(&format!("SELECT pg_notify('{JOB_READY_CHANNEL}', '')"))
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(
                error = %e,
                task_id = %task.id,
                "Failed to send pg_notify for new task, workers will discover it via polling"
            );
        }

        tx.commit()
            .await
            .context("Failed to commit task creation")?;

        tracing::info!(task_id = %task.id, job_id = %job_id, "Job task enqueued");

        Ok(task)
    }

    /// Atomically claim the next ready task.
    ///
    /// Uses FOR UPDATE SKIP LOCKED so concurrent workers never claim the
    /// same task; the claimed row moves to running with started_at set.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next(&self) -> Result<Option<Task>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM job_tasks
            WHERE status IN ('pending', 'scheduled')
                AND scheduled_at <= NOW()
            ORDER BY scheduled_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        ))
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch next task")?;

        if let Some(task) = task {
            let claimed: Task = sqlx::query_as::<Postgres, Task>(&format!(
                r#"
                UPDATE job_tasks
                SET status = 'running',
                    started_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {TASK_COLUMNS}
                "#,
            ))
            .bind(task.id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to mark task as running")?;

            tx.commit().await.context("Failed to commit claim")?;

            tracing::debug!(task_id = %claimed.id, job_id = %claimed.job_id, "Task claimed");

            Ok(Some(claimed))
        } else {
            tx.rollback().await.ok();
            Ok(None)
        }
    }

    /// Acknowledge a task whose dispatch succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn mark_completed(&self, task_id: Uuid) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            UPDATE job_tasks
            SET status = 'completed',
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark task as completed")?;

        tracing::info!(task_id = %task_id, job_id = %task.job_id, "Task completed");

        Ok(task)
    }

    /// Acknowledge a task that will not be retried again.
    #[tracing::instrument(skip(self, error))]
    pub async fn mark_failed(&self, task_id: Uuid, error: &str) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            UPDATE job_tasks
            SET status = 'failed',
                last_error = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id)
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark task as failed")?;

        tracing::error!(
            task_id = %task_id,
            job_id = %task.job_id,
            retry_count = task.retry_count,
            "Task failed"
        );

        Ok(task)
    }

    /// Schedule the next attempt after a recoverable failure.
    ///
    /// Increments retry_count and moves the task to scheduled with
    /// scheduled_at pushed out by the backoff delay.
    #[tracing::instrument(skip(self, error))]
    pub async fn schedule_retry(
        &self,
        task_id: Uuid,
        backoff_seconds: u64,
        error: &str,
    ) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            UPDATE job_tasks
            SET status = 'scheduled',
                retry_count = retry_count + 1,
                last_error = $2,
                scheduled_at = NOW() + ($3 * interval '1 second'),
                started_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id)
        .bind(error)
        .bind(backoff_seconds as i64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to schedule task retry")?;

        tracing::info!(
            task_id = %task_id,
            job_id = %task.job_id,
            retry_count = task.retry_count,
            max_retries = task.max_retries,
            backoff_seconds = backoff_seconds,
            "Task retry scheduled"
        );

        Ok(task)
    }

    /// Return running tasks whose worker likely died back to pending.
    ///
    /// A task is stale once it has been running longer than its timeout plus
    /// the grace period. Returns the number of tasks reaped.
    #[tracing::instrument(skip(self))]
    pub async fn reap_stale_running(&self, grace_period_secs: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE job_tasks
            SET status = 'pending',
                started_at = NULL,
                updated_at = NOW()
            WHERE status = 'running'
                AND started_at IS NOT NULL
                AND started_at < NOW()
                    - (COALESCE(timeout_seconds, 3600) * interval '1 second')
                    - ($1 * interval '1 second')
            "#,
        )
        .bind(grace_period_secs)
        .execute(&self.pool)
        .await
        .context("Failed to reap stale running tasks")?;

        let count = result.rows_affected();
        if count > 0 {
            tracing::warn!(count = count, "Reaped stale running tasks");
        }

        Ok(count)
    }
}
