//! Anthropic (Claude) text provider using the Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::provider::{ProviderError, TextProvider, TextRequest};
use crate::providers::classify_http_error;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

// Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text { text: String },
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for Anthropic: {}", e))?;

        Ok(Self {
            api_key,
            model,
            base_url: API_BASE.to_string(),
            http_client,
        })
    }

    /// Point the provider at a different API base (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError> {
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![ContentBlock::Text {
                    text: request.prompt.clone(),
                }],
            }],
        };

        tracing::debug!(model = %self.model, "Sending Messages API request to Anthropic");

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status.as_u16(), &error_text));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlockResponse::Text { text } => text,
            })
            .next()
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new(
            "sk-ant-test".to_string(),
            "claude-sonnet-4-20250514".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_generate_text_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"A thoughtful LinkedIn post."}]}"#)
            .create_async()
            .await;

        let text = provider(&server.url())
            .generate_text(&TextRequest::new("system", "prompt"))
            .await
            .unwrap();

        assert_eq!(text, "A thoughtful LinkedIn post.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_text_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(529)
            .with_body(r#"{"error":{"message":"Overloaded"}}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_text(&TextRequest::new("system", "prompt"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Http { status: 529, .. }));
    }

    #[tokio::test]
    async fn test_generate_text_empty_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"content":[]}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_text(&TextRequest::new("system", "prompt"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Empty));
    }
}
