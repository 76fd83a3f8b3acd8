use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::ContentType;

/// Job lifecycle status.
///
/// Transitions are monotonic: `Pending -> Processing -> Completed | Failed`.
/// There is no explicit retrying state; task retries re-enter the
/// processing path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "job_status", rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and Failed are terminal; no further transitions occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Advisory generation options attached to a job.
///
/// Purely prompt content; no effect on control flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
}

/// One end-to-end repurposing request for a single piece of source content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub original_content: String,
    /// Requested artifact set, in request order.
    pub content_types: Vec<ContentType>,
    pub options: GenerationOptions,
    pub status: JobStatus,
    /// Set if and only if status is Failed.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set if and only if status is terminal.
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Job {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let content_types = row
            .get::<Vec<String>, _>("content_types")
            .iter()
            .map(|s| s.parse::<ContentType>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse content_types: {}", e).into())
            })?;
        let options = row
            .get::<Option<serde_json::Value>, _>("options")
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(format!("Failed to parse options: {}", e).into()))?
            .unwrap_or_default();
        Ok(Job {
            id: row.get("id"),
            title: row.get("title"),
            original_content: row.get("original_content"),
            content_types,
            options,
            status: row.get("status"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

/// Fields the submission gateway provides when creating a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub original_content: String,
    pub content_types: Vec<ContentType>,
    #[serde(default)]
    pub options: GenerationOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_display() {
        assert_eq!(JobStatus::Pending.to_string(), "pending");
        assert_eq!(JobStatus::Processing.to_string(), "processing");
        assert_eq!(JobStatus::Completed.to_string(), "completed");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("pending".parse::<JobStatus>().unwrap(), JobStatus::Pending);
        assert_eq!("failed".parse::<JobStatus>().unwrap(), JobStatus::Failed);
        assert!("retrying".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_options_round_trip() {
        let options = GenerationOptions {
            tone: Some("playful".to_string()),
            visual_style: None,
            hashtags: vec!["#rust".to_string()],
        };
        let value = serde_json::to_value(&options).unwrap();
        let back: GenerationOptions = serde_json::from_value(value).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_options_default_from_empty_json() {
        let options: GenerationOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(options, GenerationOptions::default());
    }
}
