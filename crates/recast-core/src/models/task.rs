use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Queue-side status of a job-processing task.
///
/// `Scheduled` is a pending task whose `scheduled_at` lies in the future
/// (retry backoff); workers treat both as claimable once due.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "task_status", rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Scheduled => write!(f, "scheduled"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "scheduled" => Ok(TaskStatus::Scheduled),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

/// One job-processing attempt on the task queue.
///
/// The payload is the job id alone; workers always re-read job state from
/// the record store, which is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: TaskStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub timeout_seconds: Option<i32>,
    pub last_error: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Task {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Task {
            id: row.get("id"),
            job_id: row.get("job_id"),
            status: row.get("status"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            timeout_seconds: row.get("timeout_seconds"),
            last_error: row.get("last_error"),
            scheduled_at: row.get("scheduled_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl Task {
    pub fn is_ready_to_run(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::Scheduled)
            && self.scheduled_at <= Utc::now()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with(status: TaskStatus, scheduled_at: DateTime<Utc>, retry_count: i32) -> Task {
        Task {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            status,
            retry_count,
            max_retries: 3,
            timeout_seconds: Some(600),
            last_error: None,
            scheduled_at,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_task_status_round_trip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Scheduled,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_pending_task_is_ready() {
        let task = task_with(
            TaskStatus::Pending,
            Utc::now() - chrono::Duration::seconds(10),
            0,
        );
        assert!(task.is_ready_to_run());
    }

    #[test]
    fn test_scheduled_in_future_is_not_ready() {
        let task = task_with(
            TaskStatus::Scheduled,
            Utc::now() + chrono::Duration::seconds(60),
            1,
        );
        assert!(!task.is_ready_to_run());
    }

    #[test]
    fn test_running_task_is_not_ready() {
        let task = task_with(
            TaskStatus::Running,
            Utc::now() - chrono::Duration::seconds(10),
            0,
        );
        assert!(!task.is_ready_to_run());
    }

    #[test]
    fn test_can_retry_under_and_at_limit() {
        assert!(task_with(TaskStatus::Failed, Utc::now(), 2).can_retry());
        assert!(!task_with(TaskStatus::Failed, Utc::now(), 3).can_retry());
        assert!(!task_with(TaskStatus::Failed, Utc::now(), 5).can_retry());
    }
}
