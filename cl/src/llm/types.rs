//! Message and streaming types shared by the orchestrator and LLM clients

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tools::ToolSchema;

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A completed tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub name: String,
    /// Raw JSON argument text as streamed by the model
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message carrying the tool calls of a round
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        debug!(count = tool_calls.len(), "ChatMessage::assistant_with_tools: called");
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool reply keyed by the originating call id
    pub fn tool_reply(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// One fragment of a streamed tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    /// Position of the call within the response; fragments without one are dropped
    pub index: Option<usize>,
    pub id: Option<String>,
    pub call_type: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// One incremental fragment of a streamed response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDelta {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    pub finish_reason: Option<String>,
}

impl StreamDelta {
    /// Text-only fragment
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Tool-call fragment at `index`
    pub fn tool_call(
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) -> Self {
        Self {
            tool_calls: vec![ToolCallDelta {
                index: Some(index),
                id: id.map(str::to_string),
                call_type: id.map(|_| "function".to_string()),
                name: name.map(str::to_string),
                arguments: arguments.map(str::to_string),
            }],
            ..Default::default()
        }
    }
}

/// Request for one streamed completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full history, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Declared tools; omitted from the wire request when empty
    pub tools: Vec<ToolSchema>,
    pub max_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_reply_carries_call_id() {
        let msg = ChatMessage::tool_reply("call_1", "{}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_chat_message_serialization_skips_empty() {
        let msg = ChatMessage::user("hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("tool_calls").is_none());
        assert!(value.get("tool_call_id").is_none());
    }

    #[test]
    fn test_stream_delta_helpers() {
        let delta = StreamDelta::tool_call(1, Some("call_9"), Some("read_file"), None);
        assert_eq!(delta.tool_calls[0].index, Some(1));
        assert_eq!(delta.tool_calls[0].call_type.as_deref(), Some("function"));
        assert!(delta.content.is_none());

        let delta = StreamDelta::text("hello");
        assert_eq!(delta.content.as_deref(), Some("hello"));
        assert!(delta.tool_calls.is_empty());
    }
}
