//! Application state shared by the worker pool.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use recast_db::{JobRepository, TaskRepository};
use recast_pipeline::Orchestrator;
use recast_worker::JobDispatchContext;

pub struct AppState {
    pub jobs: JobRepository,
    pub tasks: TaskRepository,
    pub orchestrator: Orchestrator,
}

#[async_trait]
impl JobDispatchContext for AppState {
    async fn dispatch_job(self: Arc<Self>, job_id: Uuid) -> Result<()> {
        self.orchestrator.process_job(job_id).await
    }
}
