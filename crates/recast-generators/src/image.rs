//! Image artifact generator: prompt derivation, image provider chain,
//! storage sink write.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use recast_core::models::GenerationRequest;
use recast_storage::Storage;

use crate::chain::{ImageProviderChain, TextProviderChain};
use crate::generator::{ArtifactGenerator, GeneratedArtifact, GenerationError};
use crate::prompt;

pub struct ImageGenerator {
    prompt_chain: TextProviderChain,
    image_chain: ImageProviderChain,
    storage: Arc<dyn Storage>,
    max_source_chars: usize,
}

impl ImageGenerator {
    pub fn new(
        prompt_chain: TextProviderChain,
        image_chain: ImageProviderChain,
        storage: Arc<dyn Storage>,
        max_source_chars: usize,
    ) -> Self {
        Self {
            prompt_chain,
            image_chain,
            storage,
            max_source_chars,
        }
    }
}

#[async_trait]
impl ArtifactGenerator for ImageGenerator {
    #[tracing::instrument(skip(self, request), fields(job_id = %request.job_id, content_type = %request.content_type))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        if !request.content_type.is_image() {
            return Err(GenerationError::UnsupportedContentType(
                request.content_type,
            ));
        }

        // Step 1: derive the image prompt from the source content.
        let prompt_request = prompt::image_prompt_request(request, self.max_source_chars);
        let image_prompt = self.prompt_chain.generate(&prompt_request).await?;

        tracing::debug!(prompt_chars = image_prompt.len(), "Derived image prompt");

        // Step 2: generate the image bytes.
        let image = self.image_chain.generate(&image_prompt).await?;

        // Step 3: persist through the sink; the orchestrator stores the
        // locator. Any step failing fails the whole attempt.
        let filename = format!("{}.png", Uuid::new_v4());
        let locator = self
            .storage
            .put(
                request.content_type.storage_folder(),
                &filename,
                &image.content_type,
                image.data,
            )
            .await?;

        tracing::info!(locator = %locator, "Image artifact stored");

        Ok(GeneratedArtifact::Stored(locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::test_helpers::{
        attempt_log, request_for, MockStorage, ScriptedImageProvider, ScriptedTextProvider,
    };
    use recast_core::models::ContentType;

    fn prompt_chain_ok() -> TextProviderChain {
        TextProviderChain::new(vec![Arc::new(ScriptedTextProvider::ok(
            "openai",
            "a vivid scene",
            attempt_log(),
        ))])
        .unwrap()
    }

    #[tokio::test]
    async fn test_generates_and_stores_image() {
        let image_chain = ImageProviderChain::new(vec![Arc::new(ScriptedImageProvider::ok(
            "openai",
            b"pngbytes".to_vec(),
            attempt_log(),
        ))])
        .unwrap();
        let storage = Arc::new(MockStorage::new());
        let generator =
            ImageGenerator::new(prompt_chain_ok(), image_chain, storage.clone(), 1000);

        let artifact = generator
            .generate(&request_for(ContentType::Thumbnail))
            .await
            .unwrap();

        match artifact {
            GeneratedArtifact::Stored(locator) => {
                assert!(locator.starts_with("mock://thumbnails/"));
                assert_eq!(storage.file_count(), 1);
            }
            other => panic!("expected stored artifact, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prompt_step_failure_fails_whole_attempt() {
        let prompt_chain = TextProviderChain::new(vec![Arc::new(ScriptedTextProvider::failing(
            "openai",
            ProviderError::Timeout,
            attempt_log(),
        ))])
        .unwrap();
        let image_chain = ImageProviderChain::new(vec![Arc::new(ScriptedImageProvider::ok(
            "openai",
            b"pngbytes".to_vec(),
            attempt_log(),
        ))])
        .unwrap();
        let storage = Arc::new(MockStorage::new());
        let generator = ImageGenerator::new(prompt_chain, image_chain, storage.clone(), 1000);

        let err = generator
            .generate(&request_for(ContentType::Thumbnail))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Providers(_)));
        assert_eq!(storage.file_count(), 0, "no partial image output");
    }

    #[tokio::test]
    async fn test_image_chain_failure_fails_attempt() {
        let image_chain = ImageProviderChain::new(vec![Arc::new(ScriptedImageProvider::failing(
            "openai",
            ProviderError::RateLimited("429".to_string()),
            attempt_log(),
        ))])
        .unwrap();
        let storage = Arc::new(MockStorage::new());
        let generator =
            ImageGenerator::new(prompt_chain_ok(), image_chain, storage.clone(), 1000);

        let err = generator
            .generate(&request_for(ContentType::InstagramImage))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Providers(_)));
        assert_eq!(storage.file_count(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_surfaces_as_storage_error() {
        let image_chain = ImageProviderChain::new(vec![Arc::new(ScriptedImageProvider::ok(
            "openai",
            b"pngbytes".to_vec(),
            attempt_log(),
        ))])
        .unwrap();
        let storage = Arc::new(MockStorage::failing());
        let generator = ImageGenerator::new(prompt_chain_ok(), image_chain, storage, 1000);

        let err = generator
            .generate(&request_for(ContentType::Thumbnail))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Storage(_)));
    }

    #[tokio::test]
    async fn test_rejects_text_kinds() {
        let image_chain = ImageProviderChain::new(vec![Arc::new(ScriptedImageProvider::ok(
            "openai",
            b"pngbytes".to_vec(),
            attempt_log(),
        ))])
        .unwrap();
        let generator = ImageGenerator::new(
            prompt_chain_ok(),
            image_chain,
            Arc::new(MockStorage::new()),
            1000,
        );

        let err = generator
            .generate(&request_for(ContentType::Twitter))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::UnsupportedContentType(_)));
    }
}
