//! In-memory stores and generator stubs for orchestrator tests.
//!
//! The mock stores mirror the repository semantics the orchestrator relies
//! on: conditional pending -> processing claim, guarded terminal
//! transitions, and idempotent append.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use recast_core::models::{
    ContentType, GenerationOptions, GenerationRequest, Job, JobStatus, NewOutput, Output,
    OutputBody,
};
use recast_db::{JobStore, OutputStore};
use recast_generators::chain::ChainExhausted;
use recast_generators::provider::ProviderError;
use recast_generators::{ArtifactGenerator, GeneratedArtifact, GenerationError};
use recast_storage::StorageError;

/// Job store backed by a HashMap.
pub struct MockJobStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl MockJobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a pending job with the requested content types.
    pub fn insert_pending(&self, content_types: Vec<ContentType>) -> Uuid {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            title: "Why Rust".to_string(),
            original_content: "Rust is a systems language.".to_string(),
            content_types,
            options: GenerationOptions::default(),
            status: JobStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        let id = job.id;
        self.jobs.lock().unwrap().insert(id, job);
        id
    }

    /// Current state of a job (test assertions).
    pub fn get_job(&self, job_id: Uuid) -> Job {
        self.jobs.lock().unwrap().get(&job_id).cloned().unwrap()
    }

    /// Force a status (to simulate a job mid-processing).
    pub fn set_status(&self, job_id: Uuid, status: JobStatus) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&job_id).unwrap();
        job.status = status;
        job.updated_at = Utc::now();
    }
}

impl Default for MockJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MockJobStore {
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.lock().unwrap().get(&job_id).cloned())
    }

    async fn begin_processing(&self, job_id: Uuid) -> Result<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?;
        if job.status == JobStatus::Pending {
            job.status = JobStatus::Processing;
            job.updated_at = Utc::now();
        }
        Ok(job.clone())
    }

    async fn mark_completed(&self, job_id: Uuid) -> Result<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?;
        if job.status == JobStatus::Processing {
            job.status = JobStatus::Completed;
            job.error_message = None;
            job.completed_at = Some(Utc::now());
            job.updated_at = Utc::now();
        }
        Ok(job.clone())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?;
        if !job.status.is_terminal() {
            job.status = JobStatus::Failed;
            job.error_message = Some(error.to_string());
            job.completed_at = Some(Utc::now());
            job.updated_at = Utc::now();
        }
        Ok(job.clone())
    }

    async fn touch(&self, job_id: Uuid) -> Result<()> {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(&job_id) {
            job.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Output store backed by a Vec, with per-type append failure injection.
pub struct MockOutputStore {
    outputs: Mutex<Vec<Output>>,
    failing_types: Mutex<HashSet<ContentType>>,
}

impl MockOutputStore {
    pub fn new() -> Self {
        Self {
            outputs: Mutex::new(Vec::new()),
            failing_types: Mutex::new(HashSet::new()),
        }
    }

    /// Make appends for one content type fail (simulated store outage).
    pub fn fail_append_for(&self, content_type: ContentType) {
        self.failing_types.lock().unwrap().insert(content_type);
    }

    pub fn clear_append_failures(&self) {
        self.failing_types.lock().unwrap().clear();
    }

    /// Seed an output as if a previous pass had appended it.
    pub fn seed_text(&self, job_id: Uuid, content_type: ContentType, content: &str) {
        let now = Utc::now();
        self.outputs.lock().unwrap().push(Output {
            id: Uuid::new_v4(),
            job_id,
            content_type,
            content: Some(content.to_string()),
            storage_locator: None,
            created_at: now,
            updated_at: now,
        });
    }

    pub fn outputs_for(&self, job_id: Uuid) -> Vec<Output> {
        self.outputs
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.job_id == job_id)
            .cloned()
            .collect()
    }
}

impl Default for MockOutputStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputStore for MockOutputStore {
    async fn append(&self, output: &NewOutput) -> Result<Option<Output>> {
        if self
            .failing_types
            .lock()
            .unwrap()
            .contains(&output.content_type)
        {
            return Err(anyhow::anyhow!("output store unavailable"));
        }

        let mut outputs = self.outputs.lock().unwrap();
        let exists = outputs
            .iter()
            .any(|o| o.job_id == output.job_id && o.content_type == output.content_type);
        if exists {
            return Ok(None);
        }

        let (content, storage_locator) = match &output.body {
            OutputBody::Text(content) => (Some(content.clone()), None),
            OutputBody::Locator(locator) => (None, Some(locator.clone())),
        };
        let now = Utc::now();
        let row = Output {
            id: Uuid::new_v4(),
            job_id: output.job_id,
            content_type: output.content_type,
            content,
            storage_locator,
            created_at: now,
            updated_at: now,
        };
        outputs.push(row.clone());
        Ok(Some(row))
    }

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<Output>> {
        Ok(self.outputs_for(job_id))
    }
}

// Generator stubs

struct SucceedingGenerator {
    label: String,
}

#[async_trait]
impl ArtifactGenerator for SucceedingGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        if request.content_type.is_image() {
            Ok(GeneratedArtifact::Stored(format!(
                "mock://{}/{}.png",
                request.content_type.storage_folder(),
                self.label
            )))
        } else {
            Ok(GeneratedArtifact::Text(format!(
                "{} for {}",
                self.label, request.content_type
            )))
        }
    }
}

struct FailingGenerator {
    error: ProviderError,
}

#[async_trait]
impl ArtifactGenerator for FailingGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        let error = match &self.error {
            ProviderError::Timeout => ProviderError::Timeout,
            ProviderError::RateLimited(m) => ProviderError::RateLimited(m.clone()),
            ProviderError::Http { status, message } => ProviderError::Http {
                status: *status,
                message: message.clone(),
            },
            ProviderError::Network(m) => ProviderError::Network(m.clone()),
            ProviderError::InvalidResponse(m) => ProviderError::InvalidResponse(m.clone()),
            ProviderError::Empty => ProviderError::Empty,
        };
        Err(GenerationError::Providers(ChainExhausted {
            attempts: vec![("openai".to_string(), error)],
        }))
    }
}

struct StorageFailingGenerator {
    message: String,
}

#[async_trait]
impl ArtifactGenerator for StorageFailingGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        Err(GenerationError::Storage(StorageError::BackendError(
            self.message.clone(),
        )))
    }
}

/// Generator that always succeeds, labeling its artifacts.
pub fn succeeding_generator(label: &str) -> Arc<dyn ArtifactGenerator> {
    Arc::new(SucceedingGenerator {
        label: label.to_string(),
    })
}

/// Generator whose provider chain is always exhausted by the given cause.
pub fn failing_generator(error: ProviderError) -> Arc<dyn ArtifactGenerator> {
    Arc::new(FailingGenerator { error })
}

/// Generator that fails at the storage sink step.
pub fn storage_failing_generator(message: &str) -> Arc<dyn ArtifactGenerator> {
    Arc::new(StorageFailingGenerator {
        message: message.to_string(),
    })
}
