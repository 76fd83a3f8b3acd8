//! Text artifact generator: platform prompt + text provider chain.

use async_trait::async_trait;

use recast_core::models::GenerationRequest;

use crate::chain::TextProviderChain;
use crate::generator::{ArtifactGenerator, GeneratedArtifact, GenerationError};
use crate::prompt;

pub struct TextGenerator {
    chain: TextProviderChain,
    max_source_chars: usize,
}

impl TextGenerator {
    pub fn new(chain: TextProviderChain, max_source_chars: usize) -> Self {
        Self {
            chain,
            max_source_chars,
        }
    }
}

#[async_trait]
impl ArtifactGenerator for TextGenerator {
    #[tracing::instrument(skip(self, request), fields(job_id = %request.job_id, content_type = %request.content_type))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        if request.content_type.is_image() {
            return Err(GenerationError::UnsupportedContentType(
                request.content_type,
            ));
        }

        let provider_request = prompt::text_request(request, self.max_source_chars);
        let content = self.chain.generate(&provider_request).await?;

        tracing::info!(chars = content.len(), "Text artifact generated");

        Ok(GeneratedArtifact::Text(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::test_helpers::{attempt_log, request_for, ScriptedTextProvider};
    use recast_core::models::ContentType;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_generates_text_artifact() {
        let log = attempt_log();
        let chain = TextProviderChain::new(vec![Arc::new(ScriptedTextProvider::ok(
            "openai",
            "1/ thread",
            log,
        ))])
        .unwrap();
        let generator = TextGenerator::new(chain, 1000);

        let artifact = generator
            .generate(&request_for(ContentType::Twitter))
            .await
            .unwrap();

        assert_eq!(artifact, GeneratedArtifact::Text("1/ thread".to_string()));
    }

    #[tokio::test]
    async fn test_exhausted_chain_surfaces_provider_error() {
        let log = attempt_log();
        let chain = TextProviderChain::new(vec![Arc::new(ScriptedTextProvider::failing(
            "openai",
            ProviderError::Timeout,
            log,
        ))])
        .unwrap();
        let generator = TextGenerator::new(chain, 1000);

        let err = generator
            .generate(&request_for(ContentType::Twitter))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Providers(_)));
    }

    #[tokio::test]
    async fn test_rejects_image_kinds() {
        let log = attempt_log();
        let chain = TextProviderChain::new(vec![Arc::new(ScriptedTextProvider::ok(
            "openai", "text", log,
        ))])
        .unwrap();
        let generator = TextGenerator::new(chain, 1000);

        let err = generator
            .generate(&request_for(ContentType::Thumbnail))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::UnsupportedContentType(_)));
    }
}
