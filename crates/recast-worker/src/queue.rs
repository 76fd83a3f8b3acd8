//! Task queue: worker pool, LISTEN/NOTIFY or polling, retry, and submission.
//!
//! Shutdown: [`TaskQueue::shutdown`] signals the pool to stop; it does not
//! wait for in-flight tasks. For graceful shutdown, coordinate with your
//! runtime and allow time for running tasks to finish before process exit.

use anyhow::{Context, Result};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use uuid::Uuid;

use recast_core::constants::JOB_READY_CHANNEL;
use recast_core::models::Task;
use recast_core::TaskError;
use recast_db::{JobRepository, TaskRepository};

use crate::context::JobDispatchContext;

/// Maximum delay in seconds before retrying a failed task. Caps exponential
/// backoff so that high retry counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given retry count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: i32) -> u64 {
    (2_u64.pow(retry_count as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct TaskQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    pub default_timeout_seconds: i32,
    pub max_retries: i32,
    /// Interval in seconds between runs of the stale task reaper. 0 = disabled.
    pub stale_task_reap_interval_secs: u64,
    /// Grace period in seconds added to task timeout before reaping stale running tasks.
    pub stale_task_grace_period_secs: i64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1000,
            default_timeout_seconds: 600,
            max_retries: 3,
            stale_task_reap_interval_secs: 60,
            stale_task_grace_period_secs: 300,
        }
    }
}

pub struct TaskQueue {
    tasks: TaskRepository,
    config: TaskQueueConfig,
    shutdown_tx: mpsc::Sender<()>,
}

impl TaskQueue {
    /// Create a new TaskQueue with a weak reference to the dispatch context.
    ///
    /// If `pool` is `Some`, the worker uses PostgreSQL LISTEN/NOTIFY to wake
    /// immediately when tasks are enqueued, in addition to polling at
    /// `poll_interval_ms`. If `pool` is `None`, only polling is used.
    pub fn new(
        tasks: TaskRepository,
        jobs: JobRepository,
        config: TaskQueueConfig,
        context: Weak<dyn JobDispatchContext>,
        pool: Option<sqlx::PgPool>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let tasks_clone = tasks.clone();
        let config_clone = config.clone();

        tokio::spawn(async move {
            Self::worker_pool(tasks_clone, jobs, config_clone, context, shutdown_rx, pool).await;
        });

        Self {
            tasks,
            config,
            shutdown_tx,
        }
    }

    /// Enqueue one processing attempt for a job.
    ///
    /// This is the submission gateway's entry point onto the queue after it
    /// creates the pending job record.
    #[tracing::instrument(skip(self))]
    pub async fn enqueue_job(&self, job_id: Uuid) -> Result<Uuid> {
        let task = self
            .tasks
            .enqueue(
                job_id,
                self.config.max_retries,
                Some(self.config.default_timeout_seconds),
            )
            .await
            .context("Failed to enqueue job task")?;

        Ok(task.id)
    }

    async fn worker_pool(
        tasks: TaskRepository,
        jobs: JobRepository,
        config: TaskQueueConfig,
        context: Weak<dyn JobDispatchContext>,
        mut shutdown_rx: mpsc::Receiver<()>,
        pool: Option<sqlx::PgPool>,
    ) {
        let use_listen = pool.is_some();
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            listen_notify = use_listen,
            "Task queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Channel to wake the main loop when LISTEN receives a NOTIFY
        // (avoids blocking on recv when no pool).
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        if let Some(pool) = pool {
            let tx = notify_tx.clone();
            tokio::spawn(async move {
                loop {
                    match sqlx::postgres::PgListener::connect_with(&pool).await {
                        Ok(mut listener) => {
                            if let Err(e) = listener.listen(JOB_READY_CHANNEL).await {
                                tracing::warn!(error = %e, "LISTEN failed, will retry");
                                tokio::time::sleep(Duration::from_secs(5)).await;
                                continue;
                            }
                            while listener.recv().await.is_ok() {
                                let _ = tx.send(()).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "PgListener connect failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }

        // Stale task reaper (if interval > 0)
        let (reaper_shutdown_tx, mut reaper_shutdown_rx) = mpsc::channel::<()>(1);
        if config.stale_task_reap_interval_secs > 0 {
            let tasks_for_reaper = tasks.clone();
            let reap_interval = Duration::from_secs(config.stale_task_reap_interval_secs);
            let grace_period = config.stale_task_grace_period_secs;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reap_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = tasks_for_reaper.reap_stale_running(grace_period).await {
                                tracing::error!(error = %e, "Stale task reaper failed");
                            }
                        }
                        _ = reaper_shutdown_rx.recv() => break,
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Task queue worker pool shutting down");
                    let _ = reaper_shutdown_tx.send(()).await;
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch_one(&tasks, &jobs, &semaphore, &context).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&tasks, &jobs, &semaphore, &context).await;
                }
            }
        }

        tracing::info!("Task queue worker pool stopped");
    }

    async fn claim_and_dispatch_one(
        tasks: &TaskRepository,
        jobs: &JobRepository,
        semaphore: &Arc<Semaphore>,
        context: &Weak<dyn JobDispatchContext>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match tasks.claim_next().await {
            Ok(Some(task)) => {
                let tasks = tasks.clone();
                let jobs = jobs.clone();
                let ctx = context.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = Self::process_task(task, tasks, jobs, ctx).await {
                        tracing::error!(error = %e, "Task processing failed");
                    }
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No tasks available in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim task from queue");
            }
        }
    }

    #[tracing::instrument(skip(tasks, jobs, context), fields(task.id = %task.id, job.id = %task.job_id))]
    async fn process_task(
        task: Task,
        tasks: TaskRepository,
        jobs: JobRepository,
        context: Weak<dyn JobDispatchContext>,
    ) -> Result<()> {
        let ctx = context.upgrade().ok_or_else(|| {
            anyhow::anyhow!("JobDispatchContext was dropped, cannot process task")
        })?;

        let timeout_duration = task
            .timeout_seconds
            .map(|s| Duration::from_secs(s as u64))
            .unwrap_or(Duration::from_secs(600));

        let result = tokio::time::timeout(timeout_duration, ctx.dispatch_job(task.job_id)).await;

        match result {
            Ok(Ok(())) => {
                tasks
                    .mark_completed(task.id)
                    .await
                    .context("Failed to mark task as completed")?;
                tracing::info!("Task completed successfully");
                Ok(())
            }
            Ok(Err(e)) => {
                let is_unrecoverable = e
                    .downcast_ref::<TaskError>()
                    .map(|te| !te.is_recoverable())
                    .unwrap_or(false);

                tracing::error!(
                    error = %e,
                    retry_count = task.retry_count,
                    max_retries = task.max_retries,
                    unrecoverable = is_unrecoverable,
                    "Task execution failed"
                );

                if is_unrecoverable {
                    Self::fail_task_and_job(
                        &tasks,
                        &jobs,
                        &task,
                        &format!("Unrecoverable infrastructure error: {}", e),
                    )
                    .await?;
                    return Err(e);
                }

                if task.can_retry() {
                    let backoff_seconds = compute_retry_backoff_seconds(task.retry_count);
                    tracing::info!(
                        retry_count = task.retry_count + 1,
                        backoff_seconds = backoff_seconds,
                        "Scheduling task retry"
                    );
                    tasks
                        .schedule_retry(task.id, backoff_seconds, &e.to_string())
                        .await
                        .context("Failed to schedule task retry")?;
                    Ok(())
                } else {
                    Self::fail_task_and_job(
                        &tasks,
                        &jobs,
                        &task,
                        &format!(
                            "Infrastructure error persisted after {} attempts: {}",
                            task.retry_count + 1,
                            e
                        ),
                    )
                    .await?;
                    Err(e)
                }
            }
            Err(_) => {
                tracing::error!(
                    timeout_seconds = ?task.timeout_seconds,
                    "Task execution timed out"
                );
                if task.can_retry() {
                    let backoff_seconds = compute_retry_backoff_seconds(task.retry_count);
                    tasks
                        .schedule_retry(task.id, backoff_seconds, "task execution timed out")
                        .await
                        .context("Failed to schedule task retry")?;
                    Ok(())
                } else {
                    Self::fail_task_and_job(
                        &tasks,
                        &jobs,
                        &task,
                        &format!(
                            "Infrastructure error persisted after {} attempts: task execution timed out",
                            task.retry_count + 1
                        ),
                    )
                    .await?;
                    Err(anyhow::anyhow!("Task execution timed out"))
                }
            }
        }
    }

    /// Acknowledge the task terminally and surface the infrastructure error
    /// on the job, so callers can tell it apart from a content-generation
    /// failure.
    async fn fail_task_and_job(
        tasks: &TaskRepository,
        jobs: &JobRepository,
        task: &Task,
        message: &str,
    ) -> Result<()> {
        tasks
            .mark_failed(task.id, message)
            .await
            .context("Failed to mark task as failed")?;
        jobs.mark_failed(task.job_id, message)
            .await
            .context("Failed to mark job as failed after task exhaustion")?;
        Ok(())
    }

    /// Signals the worker pool to stop claiming new tasks and exit the main
    /// loop. Returns immediately; already-spawned task handlers continue
    /// until they complete or time out.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating task queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl Clone for TaskQueue {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            config: self.config.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(10), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn unrecoverable_task_error_detected() {
        let err: anyhow::Error =
            TaskError::unrecoverable(anyhow::anyhow!("job not found")).into();
        let is_unrecoverable = err
            .downcast_ref::<TaskError>()
            .map(|te| !te.is_recoverable())
            .unwrap_or(false);
        assert!(is_unrecoverable);
    }

    #[test]
    fn recoverable_task_error_detected() {
        let err: anyhow::Error = TaskError::recoverable(anyhow::anyhow!("db outage")).into();
        let is_unrecoverable = err
            .downcast_ref::<TaskError>()
            .map(|te| !te.is_recoverable())
            .unwrap_or(false);
        assert!(!is_unrecoverable);
    }

    #[test]
    fn non_task_error_treated_as_recoverable() {
        let err: anyhow::Error = anyhow::anyhow!("generic error");
        let is_unrecoverable = err
            .downcast_ref::<TaskError>()
            .map(|te| !te.is_recoverable())
            .unwrap_or(false);
        assert!(!is_unrecoverable);
    }
}
