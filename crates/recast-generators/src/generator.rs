//! Generator abstraction
//!
//! One strategy per content-type family; the orchestrator picks the
//! strategy by the request's content type and persists the result.

use async_trait::async_trait;
use thiserror::Error;

use recast_core::models::{ContentType, GenerationRequest};
use recast_storage::StorageError;

use crate::chain::ChainExhausted;

/// Why one artifact attempt failed.
///
/// `Providers` means every provider in the relevant chain was tried; the
/// orchestrator records it and moves on. `Storage` is a sink outage, which
/// the orchestrator escalates for task-level retry.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Providers(#[from] ChainExhausted),

    #[error("storage sink error: {0}")]
    Storage(#[from] StorageError),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(ContentType),
}

/// A successfully generated artifact, ready to persist as one Output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedArtifact {
    /// Inline text content (text kinds).
    Text(String),
    /// Locator returned by the storage sink (image kinds).
    Stored(String),
}

/// A generation strategy for one content-type family.
///
/// Generators are pure functions of their inputs plus network and sink I/O;
/// they never persist Outputs themselves.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError>;
}
