//! Codeloop - streaming tool-calling orchestrator
//!
//! A chat model drives a local checkout by emitting tool calls inside a
//! streamed response. Codeloop assembles the streamed call fragments, runs
//! the tools, feeds the results back, and repeats until the model answers
//! without requesting tools or the round cap is hit.
//!
//! # Modules
//!
//! - [`tools`] - Tool trait, registry, and the built-in file/search/shell tools
//! - [`llm`] - LLM client trait and the OpenAI-compatible streaming client
//! - [`conversation`] - Fragment accumulation and the round loop
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod tools;

// Re-export commonly used types
pub use config::{AgentConfig, Config, LlmConfig};
pub use conversation::{ConversationEvent, ConversationOutcome, Orchestrator, OrchestratorConfig, StopCause};
pub use llm::{LlmClient, LlmError, create_client};
pub use tools::{Tool, ToolError, ToolManager, ToolResult, standard_manager};
