//! Conversation orchestration
//!
//! Sends the running history to the model, assembles streamed tool calls,
//! executes them through the `ToolManager`, and repeats until the model
//! answers without tools or the round cap is reached.

mod accumulator;
mod orchestrator;
mod prompt;

pub use accumulator::ToolCallAccumulator;
pub use orchestrator::{
    ConversationEvent, ConversationOutcome, History, MAX_ROUNDS, Orchestrator, OrchestratorConfig, StopCause,
    parse_arguments,
};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, render_system_prompt};
