//! Stability AI image provider (text-to-image, base64 artifacts).

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::provider::{GeneratedImage, ImageProvider, ProviderError};
use crate::providers::classify_http_error;

const DEFAULT_IMAGE_DIMENSION: u32 = 1024;
const DEFAULT_CFG_SCALE: f32 = 7.0;
const DEFAULT_STEPS: u32 = 30;

#[derive(Clone)]
pub struct StabilityProvider {
    api_key: String,
    api_host: String,
    engine_id: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TextToImageRequest {
    text_prompts: Vec<TextPrompt>,
    height: u32,
    width: u32,
    cfg_scale: f32,
    steps: u32,
    samples: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt {
    text: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    base64: String,
}

impl StabilityProvider {
    pub fn new(
        api_key: String,
        api_host: String,
        engine_id: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for Stability: {}", e))?;

        Ok(Self {
            api_key,
            api_host,
            engine_id,
            http_client,
        })
    }
}

#[async_trait]
impl ImageProvider for StabilityProvider {
    fn name(&self) -> &str {
        "stability"
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let body = TextToImageRequest {
            text_prompts: vec![TextPrompt {
                text: prompt.to_string(),
                weight: 1.0,
            }],
            height: DEFAULT_IMAGE_DIMENSION,
            width: DEFAULT_IMAGE_DIMENSION,
            cfg_scale: DEFAULT_CFG_SCALE,
            steps: DEFAULT_STEPS,
            samples: 1,
        };

        tracing::debug!(engine_id = %self.engine_id, "Sending text-to-image request to Stability");

        let response = self
            .http_client
            .post(format!(
                "{}/v1/generation/{}/text-to-image",
                self.api_host.trim_end_matches('/'),
                self.engine_id
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status.as_u16(), &error_text));
        }

        let parsed: TextToImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let artifact = parsed
            .artifacts
            .first()
            .ok_or_else(|| ProviderError::InvalidResponse("no artifacts in response".to_string()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&artifact.base64)
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid base64: {}", e)))?;

        if data.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(GeneratedImage {
            data,
            content_type: "image/png".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> StabilityProvider {
        StabilityProvider::new(
            "sk-stab-test".to_string(),
            base_url.to_string(),
            "stable-diffusion-xl-1024-v1-0".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_image_decodes_base64() {
        let mut server = mockito::Server::new_async().await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"pngbytes");
        let mock = server
            .mock(
                "POST",
                "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image",
            )
            .match_header("authorization", "Bearer sk-stab-test")
            .with_status(200)
            .with_body(format!(r#"{{"artifacts":[{{"base64":"{}"}}]}}"#, encoded))
            .create_async()
            .await;

        let image = provider(&server.url())
            .generate_image("a red fox")
            .await
            .unwrap();

        assert_eq!(image.data, b"pngbytes".to_vec());
        assert_eq!(image.content_type, "image/png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_image_invalid_base64() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image",
            )
            .with_status(200)
            .with_body(r#"{"artifacts":[{"base64":"%%%not-base64%%%"}]}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_image("a red fox")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_generate_image_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image",
            )
            .with_status(401)
            .with_body(r#"{"message":"invalid api key"}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_image("a red fox")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Http { status: 401, .. }));
    }
}
