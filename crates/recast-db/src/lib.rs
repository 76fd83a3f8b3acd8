//! Recast Database Layer
//!
//! This crate provides the job record store repositories and the task table
//! behind the queue, plus the store trait seams used by the pipeline.

pub mod db;
pub mod store_traits;

// Re-exports: repositories
pub use db::{JobRepository, OutputRepository, TaskRepository};

// Re-exports: store traits (implemented by the concrete repositories)
pub use store_traits::{JobStore, OutputStore};
