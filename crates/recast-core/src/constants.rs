//! Shared constants.

/// Postgres NOTIFY channel raised when a job task is enqueued, so idle
/// workers wake immediately instead of waiting for the next poll.
pub const JOB_READY_CHANNEL: &str = "recast_job_ready";
