//! Store trait abstractions for pipeline testing
//!
//! These traits define the minimal interface the orchestrator needs from the
//! job record store, allowing the pipeline crate to run its tests against
//! in-memory mocks without a database.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use recast_core::models::{Job, NewOutput, Output};

/// Job record operations needed by the orchestrator.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Conditional pending -> processing transition; returns the row after
    /// the attempt (possibly already processing or terminal).
    async fn begin_processing(&self, job_id: Uuid) -> Result<Job>;

    /// Terminal transition with at least one output produced.
    async fn mark_completed(&self, job_id: Uuid) -> Result<Job>;

    /// Terminal transition with the aggregated failure reason.
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<Job>;

    /// Bump updated_at after a failed artifact attempt.
    async fn touch(&self, job_id: Uuid) -> Result<()>;
}

/// Output collection operations needed by the orchestrator.
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Append-only, idempotent insert; `None` means an output for this
    /// (job, content type) already existed.
    async fn append(&self, output: &NewOutput) -> Result<Option<Output>>;

    /// All outputs produced so far for a job.
    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<Output>>;
}
