//! Database repositories for the data access layer
//!
//! Raw-SQL repositories over Postgres. Each repository owns one domain
//! entity: jobs, content outputs, and queue tasks.

pub mod job;
pub mod output;
pub mod task;

pub use job::JobRepository;
pub use output::OutputRepository;
pub use task::TaskRepository;
