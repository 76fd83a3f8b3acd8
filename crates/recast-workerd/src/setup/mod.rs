//! Application setup and initialization
//!
//! Initialization logic extracted from main.rs: database pool + migrations,
//! storage backend, provider chains, generators, orchestrator, task queue.

pub mod database;
pub mod services;

use anyhow::{Context, Result};
use std::sync::Arc;

use recast_core::Config;
use recast_worker::{JobDispatchContext, TaskQueue, TaskQueueConfig};

use crate::state::AppState;

/// Initialize the entire application and start the worker pool.
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, TaskQueue)> {
    let pool = database::setup_database(config).await?;

    let storage = recast_storage::create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(backend = %storage.backend_type(), "Storage backend ready");

    let state = services::initialize_services(config, pool.clone(), storage)?;

    let queue_config = TaskQueueConfig {
        max_workers: config.worker_max_workers,
        poll_interval_ms: config.worker_poll_interval_ms,
        default_timeout_seconds: config.worker_task_timeout_seconds,
        max_retries: config.worker_max_retries,
        stale_task_reap_interval_secs: config.stale_task_reap_interval_secs,
        stale_task_grace_period_secs: config.stale_task_grace_period_secs,
    };

    let context: Arc<dyn JobDispatchContext> = state.clone();
    let queue = TaskQueue::new(
        state.tasks.clone(),
        state.jobs.clone(),
        queue_config,
        Arc::downgrade(&context),
        Some(pool),
    );

    Ok((state, queue))
}
