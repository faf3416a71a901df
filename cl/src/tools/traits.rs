//! Tool trait definition

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{ToolContext, ToolError};

/// Declared shape of a tool, sent to the model as a function declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSchema {
    /// Create a new tool schema
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        let name = name.into();
        debug!(%name, "ToolSchema::new: called");
        Self {
            name,
            description: description.into(),
            input_schema,
        }
    }

    /// Convert to the OpenAI `tools` entry format
    pub fn to_openai_schema(&self) -> Value {
        debug!(%self.name, "ToolSchema::to_openai_schema: called");
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

/// A tool that can be called by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the function name the model calls)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Full declared schema
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description(), self.input_schema())
    }

    /// Execute the tool
    ///
    /// `input` is the model's argument object with the working directory
    /// merged in; `ctx` carries the same working directory as a typed value.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

type ToolFn = dyn Fn(Map<String, Value>) -> Result<Value, ToolError> + Send + Sync;

/// A tool assembled from a schema and a plain function over the argument map
///
/// The function sees the working directory only through the reserved
/// `__work_dir__` key in its arguments.
pub struct FnTool {
    schema: ToolSchema,
    function: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(schema: ToolSchema, function: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        debug!(name = %schema.name, "FnTool::new: called");
        Self {
            schema,
            function: Box::new(function),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn description(&self) -> &str {
        &self.schema.description
    }

    fn input_schema(&self) -> Value {
        self.schema.input_schema.clone()
    }

    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(name = %self.schema.name, "FnTool::execute: called");
        let args = match input {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(ToolError::invalid("arguments", "a JSON object")),
        };
        (self.function)(args)
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(name: impl Into<String>, result: Value) -> Self {
        debug!("ToolResult::success: called");
        Self {
            name: name.into(),
            result: Some(result),
            error: None,
            success: true,
        }
    }

    /// Create a failed result
    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        debug!("ToolResult::failure: called");
        Self {
            name: name.into(),
            result: None,
            error: Some(error.into()),
            success: false,
        }
    }

    /// Text sent back to the model as the tool reply
    pub fn to_reply_content(&self) -> String {
        if !self.success {
            return format!("Tool execution failed: {}", self.error.as_deref().unwrap_or("unknown error"));
        }
        match &self.result {
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            None => "null".to_string(),
        }
    }
}
