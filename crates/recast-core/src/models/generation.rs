use uuid::Uuid;

use super::{ContentType, GenerationOptions, Job};

/// The orchestrator's internal unit of work: a (job snapshot, content type)
/// pair handed to a generator. Never persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub job_id: Uuid,
    pub title: String,
    pub source_text: String,
    pub content_type: ContentType,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn for_job(job: &Job, content_type: ContentType) -> Self {
        Self {
            job_id: job.id,
            title: job.title.clone(),
            source_text: job.original_content.clone(),
            content_type,
            options: job.options.clone(),
        }
    }
}
