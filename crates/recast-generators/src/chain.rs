//! Provider fallback chains
//!
//! An ordered list of capability-equivalent providers. Generation walks the
//! list in configured priority order and returns the first success; the
//! order is fixed at construction, so the same availability conditions take
//! the same fallback path every run.

use std::fmt;
use std::sync::Arc;

use crate::provider::{GeneratedImage, ImageProvider, ProviderError, TextProvider, TextRequest};

/// Every provider in a chain failed. Carries each (provider, cause) pair in
/// attempt order for the aggregated job error message.
#[derive(Debug)]
pub struct ChainExhausted {
    pub attempts: Vec<(String, ProviderError)>,
}

impl fmt::Display for ChainExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all providers failed: ")?;
        for (i, (name, error)) in self.attempts.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", name, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ChainExhausted {}

/// Ordered fallback chain over text providers.
#[derive(Clone)]
pub struct TextProviderChain {
    providers: Vec<Arc<dyn TextProvider>>,
}

impl TextProviderChain {
    /// Build a chain from providers in priority order.
    pub fn new(providers: Vec<Arc<dyn TextProvider>>) -> anyhow::Result<Self> {
        if providers.is_empty() {
            return Err(anyhow::anyhow!(
                "Text provider chain needs at least one provider"
            ));
        }
        Ok(Self { providers })
    }

    /// Try each provider in order; first success wins.
    pub async fn generate(&self, request: &TextRequest) -> Result<String, ChainExhausted> {
        let mut attempts = Vec::new();

        for provider in &self.providers {
            match provider.generate_text(request).await {
                Ok(text) => {
                    if !attempts.is_empty() {
                        tracing::info!(
                            provider = provider.name(),
                            failed_attempts = attempts.len(),
                            "Text generated after provider fallback"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "Text provider failed, falling back"
                    );
                    attempts.push((provider.name().to_string(), e));
                }
            }
        }

        Err(ChainExhausted { attempts })
    }
}

/// Ordered fallback chain over image providers.
#[derive(Clone)]
pub struct ImageProviderChain {
    providers: Vec<Arc<dyn ImageProvider>>,
}

impl ImageProviderChain {
    /// Build a chain from providers in priority order.
    pub fn new(providers: Vec<Arc<dyn ImageProvider>>) -> anyhow::Result<Self> {
        if providers.is_empty() {
            return Err(anyhow::anyhow!(
                "Image provider chain needs at least one provider"
            ));
        }
        Ok(Self { providers })
    }

    /// Try each provider in order; first success wins.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ChainExhausted> {
        let mut attempts = Vec::new();

        for provider in &self.providers {
            match provider.generate_image(prompt).await {
                Ok(image) => {
                    if !attempts.is_empty() {
                        tracing::info!(
                            provider = provider.name(),
                            failed_attempts = attempts.len(),
                            "Image generated after provider fallback"
                        );
                    }
                    return Ok(image);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "Image provider failed, falling back"
                    );
                    attempts.push((provider.name().to_string(), e));
                }
            }
        }

        Err(ChainExhausted { attempts })
    }
}
