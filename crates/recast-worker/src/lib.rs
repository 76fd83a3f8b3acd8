//! Recast Worker – background task queue and worker infrastructure.
//!
//! This crate provides the task queue (polling + LISTEN/NOTIFY wakeup,
//! worker pool, retry with backoff, stale-task reaping) and the
//! `JobDispatchContext` trait the daemon implements to hand claimed tasks to
//! the orchestrator.

mod context;
mod queue;

pub use context::JobDispatchContext;
pub use queue::{TaskQueue, TaskQueueConfig};
