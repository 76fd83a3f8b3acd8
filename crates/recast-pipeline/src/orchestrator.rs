//! Job orchestrator
//!
//! Drives one job to a terminal status. Per-artifact failures are recorded
//! and never abort the job; the job completes if at least one artifact was
//! produced and fails only when zero succeeded. Persistence failures are
//! escalated to the dispatch loop after all types have been attempted, so
//! the outer retry can fill the gaps idempotently.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use recast_core::models::{ContentType, GenerationRequest, Job, NewOutput};
use recast_core::TaskError;
use recast_db::{JobStore, OutputStore};
use recast_generators::{ArtifactGenerator, GeneratedArtifact, GenerationError};

pub struct Orchestrator {
    jobs: Arc<dyn JobStore>,
    outputs: Arc<dyn OutputStore>,
    text_generator: Arc<dyn ArtifactGenerator>,
    image_generator: Arc<dyn ArtifactGenerator>,
}

impl Orchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        outputs: Arc<dyn OutputStore>,
        text_generator: Arc<dyn ArtifactGenerator>,
        image_generator: Arc<dyn ArtifactGenerator>,
    ) -> Self {
        Self {
            jobs,
            outputs,
            text_generator,
            image_generator,
        }
    }

    fn generator_for(&self, content_type: ContentType) -> &Arc<dyn ArtifactGenerator> {
        if content_type.is_image() {
            &self.image_generator
        } else {
            &self.text_generator
        }
    }

    /// Process one job to a terminal status.
    ///
    /// Safe to call again for the same job: a terminal job is a no-op, and a
    /// redelivered task only generates content types that have no output yet.
    #[tracing::instrument(skip(self), fields(job_id = %job_id))]
    pub async fn process_job(&self, job_id: Uuid) -> Result<()> {
        let job = self
            .jobs
            .get(job_id)
            .await
            .context("Failed to load job")?
            .ok_or_else(|| {
                TaskError::unrecoverable(anyhow::anyhow!("Job {} not found", job_id))
            })?;

        if job.status.is_terminal() {
            tracing::info!(status = %job.status, "Job already terminal, skipping");
            return Ok(());
        }

        let job = self
            .jobs
            .begin_processing(job_id)
            .await
            .context("Failed to claim job for processing")?;

        // A concurrent delivery may have driven the job terminal between the
        // first read and the claim.
        if job.status.is_terminal() {
            tracing::info!(status = %job.status, "Job reached terminal state concurrently, skipping");
            return Ok(());
        }

        let existing = self
            .outputs
            .list_for_job(job_id)
            .await
            .context("Failed to list existing outputs")?;
        let existing_types: HashSet<ContentType> =
            existing.iter().map(|o| o.content_type).collect();

        let mut produced = existing.len();
        let mut failures: Vec<(ContentType, String)> = Vec::new();
        let mut persistence_failure: Option<anyhow::Error> = None;

        for content_type in &job.content_types {
            if existing_types.contains(content_type) {
                tracing::debug!(content_type = %content_type, "Output already present, skipping");
                continue;
            }

            match self.attempt_artifact(&job, *content_type).await {
                ArtifactOutcome::Produced => {
                    produced += 1;
                }
                ArtifactOutcome::Failed(cause) => {
                    failures.push((*content_type, cause));
                    // updated_at bump is best-effort
                    self.jobs.touch(job_id).await.ok();
                }
                ArtifactOutcome::PersistenceFailed(cause, error) => {
                    failures.push((*content_type, cause));
                    if persistence_failure.is_none() {
                        persistence_failure = Some(error);
                    }
                }
            }
        }

        // Infrastructure trouble: every type was still attempted, but the
        // terminal state is left for a later, healthy pass.
        if let Some(error) = persistence_failure {
            return Err(error.context(format!(
                "Persistence failure while recording outputs for job {}",
                job_id
            )));
        }

        if produced > 0 {
            self.jobs
                .mark_completed(job_id)
                .await
                .context("Failed to mark job as completed")?;
            tracing::info!(
                produced = produced,
                failed = failures.len(),
                "Job completed"
            );
        } else {
            let message = aggregate_failures(&failures);
            self.jobs
                .mark_failed(job_id, &message)
                .await
                .context("Failed to mark job as failed")?;
            tracing::error!(error = %message, "Job failed, no artifacts produced");
        }

        Ok(())
    }

    async fn attempt_artifact(&self, job: &Job, content_type: ContentType) -> ArtifactOutcome {
        let request = GenerationRequest::for_job(job, content_type);
        let generator = self.generator_for(content_type);

        let artifact = match generator.generate(&request).await {
            Ok(artifact) => artifact,
            Err(GenerationError::Storage(e)) => {
                tracing::error!(
                    job_id = %job.id,
                    content_type = %content_type,
                    error = %e,
                    "Storage sink failed during artifact generation"
                );
                return ArtifactOutcome::PersistenceFailed(
                    format!("storage sink error: {}", e),
                    anyhow::Error::new(e),
                );
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job.id,
                    content_type = %content_type,
                    error = %e,
                    "Artifact generation failed"
                );
                return ArtifactOutcome::Failed(e.to_string());
            }
        };

        let new_output = match artifact {
            GeneratedArtifact::Text(content) => NewOutput::text(job.id, content_type, content),
            GeneratedArtifact::Stored(locator) => {
                NewOutput::locator(job.id, content_type, locator)
            }
        };

        match self.outputs.append(&new_output).await {
            // None means another delivery appended first; the output exists
            // either way.
            Ok(_) => ArtifactOutcome::Produced,
            Err(e) => {
                tracing::error!(
                    job_id = %job.id,
                    content_type = %content_type,
                    error = %e,
                    "Failed to persist output"
                );
                ArtifactOutcome::PersistenceFailed(
                    format!("failed to persist output: {}", e),
                    e,
                )
            }
        }
    }
}

enum ArtifactOutcome {
    Produced,
    Failed(String),
    PersistenceFailed(String, anyhow::Error),
}

fn aggregate_failures(failures: &[(ContentType, String)]) -> String {
    if failures.is_empty() {
        return "no content types requested".to_string();
    }
    failures
        .iter()
        .map(|(content_type, cause)| format!("{}: {}", content_type, cause))
        .collect::<Vec<_>>()
        .join("; ")
}
