//! Job dispatch context trait
//!
//! The daemon implements this trait for its application state. The worker
//! holds a weak reference and calls `dispatch_job` with the claimed task's
//! job id; the implementation invokes the orchestrator.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Context for job dispatch.
#[async_trait]
pub trait JobDispatchContext: Send + Sync {
    /// Process the job behind a claimed task. A returned error triggers the
    /// queue's retry policy; per-artifact failures are handled inside the
    /// orchestrator and never surface here.
    async fn dispatch_job(self: Arc<Self>, job_id: Uuid) -> Result<()>;
}
