//! Provider abstraction
//!
//! One trait per provider capability. Each strategy exposes a single
//! generate operation returning a tagged result; the fallback chains iterate
//! strategies until success or exhaustion, so control flow stays explicit
//! and testable.

use async_trait::async_trait;
use thiserror::Error;

/// A single provider call failure.
///
/// Rate limits, timeouts and malformed responses are all provider errors:
/// the chain falls back to the next provider rather than retrying in place.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("empty response")]
    Empty,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// A prompt for a text-generation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl TextRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            prompt: prompt.into(),
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Raw bytes of one generated image.
///
/// Providers that return a URL download it themselves; providers that return
/// base64 decode it. Callers always receive bytes ready for the sink.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// A text-generation provider (one external AI service).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider name used in logs and aggregated error messages.
    fn name(&self) -> &str;

    /// Generate text for the request. An empty response is an error, never
    /// an empty success.
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError>;
}

/// An image-generation provider (one external AI service).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider name used in logs and aggregated error messages.
    fn name(&self) -> &str;

    /// Generate one image for the prompt and return its raw bytes.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError>;
}
