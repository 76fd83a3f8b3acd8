//! Provider implementations
//!
//! One module per external generative-AI service. Base URLs are injectable
//! so tests can point a provider at a local mock server.

mod anthropic;
mod openai;
mod stability;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use stability::StabilityProvider;

use crate::provider::ProviderError;

/// Map a non-success HTTP status and error body to a provider error,
/// extracting the service's error message when the body is JSON.
pub(crate) fn classify_http_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.pointer("/error"))
                .or_else(|| v.pointer("/message"))
                .and_then(|m| m.as_str().map(String::from))
        })
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == 429 {
        ProviderError::RateLimited(message)
    } else {
        ProviderError::Http { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classified() {
        let err = classify_http_error(429, r#"{"error":{"message":"slow down"}}"#);
        assert!(matches!(err, ProviderError::RateLimited(m) if m == "slow down"));
    }

    #[test]
    fn test_http_error_keeps_status_and_message() {
        let err = classify_http_error(500, "internal");
        match err {
            ProviderError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
