//! LLM client module
//!
//! The orchestrator only sees the `LlmClient` trait; `OpenAIClient` is the
//! network implementation.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod types;

pub use client::{DeltaStream, LlmClient};
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{ChatMessage, CompletionRequest, Role, StreamDelta, ToolCall, ToolCallDelta};

use crate::config::LlmConfig;

/// Create the LLM client described by config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(model = %config.model, "create_client: called");
    Ok(Arc::new(OpenAIClient::from_config(config)?))
}
