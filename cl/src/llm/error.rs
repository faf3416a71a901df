//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the model provider
///
/// Only a failure to open a round's stream reaches the caller of the
/// orchestrator; errors on a flowing stream end that stream early.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited by provider, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("provider returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("stream broke off: {0}")]
    Stream(String),

    #[error("no API key in environment variable {env}")]
    MissingApiKey { env: String },

    #[error("could not encode request: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Wait requested by the provider on a 429
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_and_wait() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(42),
        };
        assert_eq!(err.to_string(), "rate limited by provider, retry after 42s");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));

        let err = LlmError::ApiError {
            status: 401,
            message: "invalid api key".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned 401: invalid api key");
        assert_eq!(err.retry_after(), None);
    }
}
