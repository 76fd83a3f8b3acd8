//! OpenAI provider: chat completions for text, DALL-E for images.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::provider::{GeneratedImage, ImageProvider, ProviderError, TextProvider, TextRequest};
use crate::providers::classify_http_error;

const API_BASE: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    image_model: String,
    image_size: String,
    base_url: String,
    http_client: reqwest::Client,
}

// Chat Completions API request/response structures
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// Images API request/response structures
#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        image_model: String,
        image_size: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for OpenAI: {}", e))?;

        Ok(Self {
            api_key,
            model,
            image_model,
            image_size,
            base_url: API_BASE.to_string(),
            http_client,
        })
    }

    /// Point the provider at a different API base (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the generated image bytes from the URL the API returned.
    async fn download_image(&self, url: &str) -> Result<GeneratedImage, ProviderError> {
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::InvalidResponse(format!(
                "image download failed with status {}",
                status
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(GeneratedImage { data, content_type })
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(model = %self.model, "Sending chat completion request to OpenAI");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status.as_u16(), &error_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(text.to_string())
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let body = ImageRequest {
            model: self.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.image_size.clone(),
        };

        tracing::debug!(model = %self.image_model, "Sending image generation request to OpenAI");

        let response = self
            .http_client
            .post(format!("{}/images/generations", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status.as_u16(), &error_text));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let url = parsed
            .data
            .first()
            .and_then(|d| d.url.as_deref())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("no image URL in response".to_string())
            })?;

        self.download_image(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test".to_string(),
            "gpt-4o".to_string(),
            "dall-e-3".to_string(),
            "1024x1024".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_generate_text_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"  1/ Rust is great  "}}]}"#,
            )
            .create_async()
            .await;

        let text = provider(&server.url())
            .generate_text(&TextRequest::new("system", "prompt"))
            .await
            .unwrap();

        assert_eq!(text, "1/ Rust is great");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_text_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached","type":"tokens"}}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_text(&TextRequest::new("system", "prompt"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::RateLimited(m) if m == "Rate limit reached"));
    }

    #[tokio::test]
    async fn test_generate_text_empty_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_text(&TextRequest::new("system", "prompt"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Empty));
    }

    #[tokio::test]
    async fn test_generate_text_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_text(&TextRequest::new("system", "prompt"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_generate_image_downloads_returned_url() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let _mock = server
            .mock("POST", "/images/generations")
            .with_status(200)
            .with_body(format!(r#"{{"data":[{{"url":"{}/generated/img.png"}}]}}"#, url))
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/generated/img.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("pngbytes")
            .create_async()
            .await;

        let image = provider(&url).generate_image("a red fox").await.unwrap();

        assert_eq!(image.data, b"pngbytes".to_vec());
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_generate_image_missing_url_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/images/generations")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_image("a red fox")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
