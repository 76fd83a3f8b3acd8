use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContentType;

/// One produced artifact belonging to a job.
///
/// Exactly one of `content` (text kinds) or `storage_locator` (image kinds)
/// is populated. Outputs are immutable once created; a job has at most one
/// output per requested content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub id: Uuid,
    pub job_id: Uuid,
    pub content_type: ContentType,
    pub content: Option<String>,
    pub storage_locator: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Output {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Output {
            id: row.get("id"),
            job_id: row.get("job_id"),
            content_type: row.get::<String, _>("content_type").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse content_type: {}", e).into())
            })?,
            content: row.get("content"),
            storage_locator: row.get("storage_locator"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

/// The body of an output to append: inline text or a storage locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputBody {
    Text(String),
    Locator(String),
}

/// A not-yet-persisted output, produced by a successful generation.
#[derive(Debug, Clone)]
pub struct NewOutput {
    pub job_id: Uuid,
    pub content_type: ContentType,
    pub body: OutputBody,
}

impl NewOutput {
    pub fn text(job_id: Uuid, content_type: ContentType, content: impl Into<String>) -> Self {
        Self {
            job_id,
            content_type,
            body: OutputBody::Text(content.into()),
        }
    }

    pub fn locator(job_id: Uuid, content_type: ContentType, locator: impl Into<String>) -> Self {
        Self {
            job_id,
            content_type,
            body: OutputBody::Locator(locator.into()),
        }
    }

    /// Split the body into the (content, storage_locator) column pair.
    pub fn columns(&self) -> (Option<&str>, Option<&str>) {
        match &self.body {
            OutputBody::Text(content) => (Some(content.as_str()), None),
            OutputBody::Locator(locator) => (None, Some(locator.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_output_columns_are_mutually_exclusive() {
        let job_id = Uuid::new_v4();

        let text = NewOutput::text(job_id, ContentType::Twitter, "1/ hello");
        assert_eq!(text.columns(), (Some("1/ hello"), None));

        let stored = NewOutput::locator(job_id, ContentType::Thumbnail, "http://x/y.png");
        assert_eq!(stored.columns(), (None, Some("http://x/y.png")));
    }
}
