//! Orchestrator - drives the streamed tool-calling dialogue

use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ToolCallAccumulator;
use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError, ToolCall};
use crate::tools::{ToolManager, ToolResult};

/// Cap on model rounds per query
pub const MAX_ROUNDS: usize = 5;

/// Progress surfaced while a query runs
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    /// Streamed text from the model
    TextDelta(String),
    /// A completed tool call is about to run
    ToolCallStarted { id: String, name: String, arguments: String },
    /// A tool call finished
    ToolCallFinished { id: String, result: ToolResult },
    /// The stream of a round broke off; the round continues with what arrived
    StreamInterrupted { round: usize, error: String },
    /// A round ended
    RoundComplete { round: usize, tool_calls: usize },
}

/// Why the dialogue stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// The model answered without requesting tools
    Completed,
    /// Every allowed round requested tools
    RoundLimit,
}

/// Append-only conversation history
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Result of one query
#[derive(Debug, Clone)]
pub struct ConversationOutcome {
    pub history: History,
    /// Text of the last round
    pub final_content: String,
    pub rounds: usize,
    pub stop: StopCause,
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            max_tokens: None,
        }
    }
}

/// Text and calls collected from one streamed round
struct RoundOutput {
    content: String,
    tool_calls: Vec<ToolCall>,
}

/// Drives one query through rounds of streaming and tool execution
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolManager>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolManager>, config: OrchestratorConfig) -> Self {
        debug!(tool_count = tools.len(), "Orchestrator::new: called");
        Self { llm, tools, config }
    }

    pub fn tools(&self) -> &Arc<ToolManager> {
        &self.tools
    }

    /// Run a query to completion or until the round cap
    ///
    /// Only a failure to open a round's stream is returned as an error; tool
    /// failures and broken streams are folded into the dialogue.
    pub async fn run(
        &self,
        query: &str,
        events: mpsc::Sender<ConversationEvent>,
    ) -> Result<ConversationOutcome, LlmError> {
        info!(query_len = query.len(), max_rounds = MAX_ROUNDS, "Orchestrator::run: starting query");
        let mut history = History::new();
        if !self.config.system_prompt.is_empty() {
            history.push(ChatMessage::system(self.config.system_prompt.clone()));
        }
        history.push(ChatMessage::user(query));

        let tools = self.tools.list();
        let mut final_content = String::new();

        for round in 1..=MAX_ROUNDS {
            debug!(round, "Orchestrator::run: round start");
            let request = CompletionRequest {
                messages: history.messages().to_vec(),
                tools: tools.clone(),
                max_tokens: self.config.max_tokens,
            };

            let output = self.stream_round(round, request, &events).await?;
            final_content = output.content.clone();

            if output.tool_calls.is_empty() {
                info!(round, "Orchestrator::run: model finished without tool calls");
                history.push(ChatMessage::assistant(output.content));
                let _ = events
                    .send(ConversationEvent::RoundComplete { round, tool_calls: 0 })
                    .await;
                return Ok(ConversationOutcome {
                    history,
                    final_content,
                    rounds: round,
                    stop: StopCause::Completed,
                });
            }

            let call_count = output.tool_calls.len();
            debug!(round, call_count, "Orchestrator::run: dispatching tool calls");
            history.push(ChatMessage::assistant_with_tools(output.content, output.tool_calls.clone()));

            for call in &output.tool_calls {
                let result = self.dispatch(call, &events).await;
                history.push(ChatMessage::tool_reply(call.id.clone(), result.to_reply_content()));
            }

            let _ = events
                .send(ConversationEvent::RoundComplete {
                    round,
                    tool_calls: call_count,
                })
                .await;
        }

        warn!(max_rounds = MAX_ROUNDS, "Orchestrator::run: round limit reached");
        Ok(ConversationOutcome {
            history,
            final_content,
            rounds: MAX_ROUNDS,
            stop: StopCause::RoundLimit,
        })
    }

    /// Consume one streamed response
    async fn stream_round(
        &self,
        round: usize,
        request: CompletionRequest,
        events: &mpsc::Sender<ConversationEvent>,
    ) -> Result<RoundOutput, LlmError> {
        let mut stream = self.llm.stream(request).await?;
        let mut content = String::new();
        let mut accumulator = ToolCallAccumulator::new();

        while let Some(item) = stream.next().await {
            let delta = match item {
                Ok(delta) => delta,
                Err(e) => {
                    warn!(round, error = %e, "Orchestrator::stream_round: stream interrupted");
                    let _ = events
                        .send(ConversationEvent::StreamInterrupted {
                            round,
                            error: e.to_string(),
                        })
                        .await;
                    break;
                }
            };

            if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                content.push_str(&text);
                let _ = events.send(ConversationEvent::TextDelta(text)).await;
            }
            for fragment in &delta.tool_calls {
                accumulator.push(fragment);
            }
            if let Some(reason) = &delta.finish_reason {
                debug!(round, %reason, "Orchestrator::stream_round: finish reason");
            }
        }

        Ok(RoundOutput {
            content,
            tool_calls: accumulator.finish(),
        })
    }

    /// Parse and execute one call; always yields a result
    async fn dispatch(&self, call: &ToolCall, events: &mpsc::Sender<ConversationEvent>) -> ToolResult {
        debug!(id = %call.id, name = %call.name, "Orchestrator::dispatch: called");
        let _ = events
            .send(ConversationEvent::ToolCallStarted {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            })
            .await;

        let result = match parse_arguments(&call.arguments) {
            Ok(arguments) => self.tools.execute(&call.name, arguments).await,
            Err(message) => {
                debug!(id = %call.id, %message, "Orchestrator::dispatch: bad arguments");
                ToolResult::failure(call.name.clone(), message)
            }
        };

        let _ = events
            .send(ConversationEvent::ToolCallFinished {
                id: call.id.clone(),
                result: result.clone(),
            })
            .await;
        result
    }
}

/// Parse streamed argument text into an argument map
pub fn parse_arguments(text: &str) -> Result<Map<String, Value>, String> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!(
            "failed to parse tool arguments: expected a JSON object, got {}",
            json_kind(&other)
        )),
        Err(e) => Err(format!("failed to parse tool arguments: {}", e)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StreamDelta;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::Role;
    use crate::tools::{FnTool, ToolSchema};
    use serde_json::json;

    fn manager_with_echo() -> Arc<ToolManager> {
        let manager = ToolManager::new("/tmp");
        manager
            .register_tool(Arc::new(FnTool::new(
                ToolSchema::new("echo", "Echo arguments", json!({"type": "object", "properties": {}})),
                |mut args| {
                    args.remove(crate::tools::WORK_DIR_KEY);
                    Ok(Value::Object(args))
                },
            )))
            .unwrap();
        Arc::new(manager)
    }

    fn orchestrator(llm: Arc<MockLlmClient>) -> Orchestrator {
        Orchestrator::new(
            llm,
            manager_with_echo(),
            OrchestratorConfig {
                system_prompt: "system".to_string(),
                max_tokens: None,
            },
        )
    }

    fn tool_round(id: &str, args: &str) -> Vec<StreamDelta> {
        vec![StreamDelta::tool_call(0, Some(id), Some("echo"), Some(args))]
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").unwrap().is_empty());
        assert!(parse_arguments("  ").unwrap().is_empty());
        assert_eq!(parse_arguments("{\"a\":1}").unwrap()["a"], 1);
        assert!(parse_arguments("[1]").unwrap_err().contains("expected a JSON object"));
        assert!(parse_arguments("{\"a\":").unwrap_err().starts_with("failed to parse tool arguments"));
    }

    #[tokio::test]
    async fn test_text_only_response_completes() {
        let llm = Arc::new(MockLlmClient::new(vec![vec![
            StreamDelta::text("Hello "),
            StreamDelta::text("there"),
        ]]));
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = orchestrator(llm.clone()).run("hi", tx).await.unwrap();

        assert_eq!(outcome.stop, StopCause::Completed);
        assert_eq!(outcome.final_content, "Hello there");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.history.len(), 3);
        assert_eq!(outcome.history.messages()[0].role, Role::System);

        let mut text = String::new();
        while let Ok(event) = rx.try_recv() {
            if let ConversationEvent::TextDelta(t) = event {
                text.push_str(&t);
            }
        }
        assert_eq!(text, "Hello there");
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let llm = Arc::new(MockLlmClient::new(vec![
            tool_round("call_1", "{\"x\":1}"),
            vec![StreamDelta::text("done")],
        ]));
        let (tx, _rx) = mpsc::channel(64);

        let outcome = orchestrator(llm.clone()).run("go", tx).await.unwrap();

        assert_eq!(outcome.rounds, 2);
        let messages = outcome.history.messages();
        // system, user, assistant(tool_calls), tool, assistant
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[2].tool_calls[0].id, "call_1");
        assert_eq!(messages[3].role, Role::Tool);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert!(messages[3].content.contains("\"x\": 1"));

        // The second request carries the tool reply
        let requests = llm.requests();
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[0].tools.len(), 1);
    }

    #[tokio::test]
    async fn test_round_limit() {
        // One extra scripted round that must never be requested
        let rounds = (0..=MAX_ROUNDS).map(|i| tool_round(&format!("call_{}", i), "{}")).collect();
        let llm = Arc::new(MockLlmClient::new(rounds));
        let (tx, _rx) = mpsc::channel(64);

        let outcome = orchestrator(llm.clone()).run("loop", tx).await.unwrap();

        assert_eq!(MAX_ROUNDS, 5);
        assert_eq!(outcome.stop, StopCause::RoundLimit);
        assert_eq!(outcome.rounds, MAX_ROUNDS);
        assert_eq!(llm.call_count(), MAX_ROUNDS);
    }

    #[tokio::test]
    async fn test_bad_arguments_and_unknown_tool_become_replies() {
        let llm = Arc::new(MockLlmClient::new(vec![
            vec![
                StreamDelta::tool_call(0, Some("call_a"), Some("echo"), Some("{not json")),
                StreamDelta::tool_call(1, Some("call_b"), Some("missing_tool"), Some("{}")),
            ],
            vec![StreamDelta::text("ok")],
        ]));
        let (tx, _rx) = mpsc::channel(64);

        let outcome = orchestrator(llm).run("go", tx).await.unwrap();
        let messages = outcome.history.messages();

        assert!(messages[3].content.starts_with("Tool execution failed: failed to parse tool arguments"));
        assert_eq!(messages[4].content, "Tool execution failed: tool 'missing_tool' not found");
        assert_eq!(outcome.stop, StopCause::Completed);
    }

    #[tokio::test]
    async fn test_mid_stream_error_keeps_partial_round() {
        let llm = Arc::new(MockLlmClient::with_results(vec![
            vec![
                Ok(StreamDelta::text("partial")),
                Err("connection reset".to_string()),
                Ok(StreamDelta::text(" never seen")),
            ],
        ]));
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = orchestrator(llm).run("go", tx).await.unwrap();
        assert_eq!(outcome.final_content, "partial");
        assert_eq!(outcome.stop, StopCause::Completed);

        let mut interrupted = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ConversationEvent::StreamInterrupted { .. }) {
                interrupted = true;
            }
        }
        assert!(interrupted);
    }

    #[tokio::test]
    async fn test_establishment_failure_aborts() {
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let (tx, _rx) = mpsc::channel(64);

        let err = orchestrator(llm).run("go", tx).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_no_tools_declared_when_manager_empty() {
        let llm = Arc::new(MockLlmClient::new(vec![vec![StreamDelta::text("hi")]]));
        let orchestrator = Orchestrator::new(
            llm.clone(),
            Arc::new(ToolManager::new("/tmp")),
            OrchestratorConfig::default(),
        );
        let (tx, _rx) = mpsc::channel(64);

        let outcome = orchestrator.run("hello", tx).await.unwrap();
        assert_eq!(outcome.history.len(), 2);
        assert!(llm.requests()[0].tools.is_empty());
    }
}
