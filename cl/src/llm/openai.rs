//! OpenAI-compatible Chat Completions client
//!
//! Streams `POST {base_url}/chat/completions` as server-sent events. Works
//! with any provider speaking the same protocol (DeepSeek by default).

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ChatMessage, CompletionRequest, DeltaStream, LlmClient, LlmError, Role, StreamDelta, ToolCallDelta};
use crate::config::LlmConfig;

/// OpenAI-compatible API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: Option<u32>,
}

impl OpenAIClient {
    /// Create a client with explicit settings
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;
        Ok(Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            max_tokens: None,
        })
    }

    /// Create a client from configuration, reading the API key from the environment
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "OpenAIClient::from_config: called");
        let api_key = config.get_api_key().map_err(|_| LlmError::MissingApiKey {
            env: config.api_key_env.clone(),
        })?;

        let mut client = Self::new(
            config.model.clone(),
            api_key,
            config.base_url.clone(),
            Duration::from_millis(config.timeout_ms),
        )?;
        client.max_tokens = config.max_tokens;
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, message_count = request.messages.len(), "build_request_body: called");
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": convert_messages(&request.messages),
            "stream": true,
        });

        if let Some(max_tokens) = request.max_tokens.or(self.max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            debug!("build_request_body: tools not empty, adding tools");
            body["tools"] = serde_json::json!(request.tools.iter().map(|t| t.to_openai_schema()).collect::<Vec<_>>());
            body["tool_choice"] = serde_json::json!("auto");
        } else {
            debug!("build_request_body: no tools");
        }

        body
    }
}

/// Convert history messages to the wire format
fn convert_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    debug!(message_count = %messages.len(), "convert_messages: called");
    messages
        .iter()
        .map(|msg| match msg.role {
            Role::Tool => serde_json::json!({
                "role": "tool",
                "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
                "content": msg.content,
            }),
            Role::Assistant if !msg.tool_calls.is_empty() => {
                let tool_calls: Vec<serde_json::Value> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        serde_json::json!({
                            "id": tc.id,
                            "type": tc.call_type,
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments,
                            }
                        })
                    })
                    .collect();
                let mut value = serde_json::json!({
                    "role": "assistant",
                    "tool_calls": tool_calls,
                });
                if !msg.content.is_empty() {
                    value["content"] = serde_json::json!(msg.content);
                }
                value
            }
            role => serde_json::json!({
                "role": role.as_str(),
                "content": msg.content,
            }),
        })
        .collect()
}

/// Parse one SSE `data:` payload; `None` when it carries no choice
fn parse_chunk(data: &str) -> Result<Option<StreamDelta>, LlmError> {
    let chunk: OpenAIStreamChunk = serde_json::from_str(data)?;
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    let tool_calls = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let (name, arguments) = match tc.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            ToolCallDelta {
                index: tc.index,
                id: tc.id,
                call_type: tc.call_type,
                name,
                arguments,
            }
        })
        .collect();

    Ok(Some(StreamDelta {
        content: choice.delta.content,
        tool_calls,
        finish_reason: choice.finish_reason,
    }))
}

/// Map an error seen before the stream opened
async fn establishment_error(err: reqwest_eventsource::Error) -> LlmError {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let status = status.as_u16();
            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return LlmError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                };
            }
            let message = response.text().await.unwrap_or_default();
            LlmError::ApiError { status, message }
        }
        reqwest_eventsource::Error::Transport(e) => LlmError::Network(e),
        other => LlmError::InvalidResponse(other.to_string()),
    }
}

/// Turn the opened event source into a stream of deltas
fn delta_stream(es: EventSource) -> DeltaStream {
    futures::stream::unfold(es, |mut es| async move {
        loop {
            match es.next().await {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(msg))) => {
                    if msg.data.trim() == "[DONE]" {
                        debug!("delta_stream: [DONE]");
                        es.close();
                        return None;
                    }
                    match parse_chunk(&msg.data) {
                        Ok(Some(delta)) => return Some((Ok(delta), es)),
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(error = %e, data = %msg.data, "delta_stream: skipping unparseable chunk");
                            continue;
                        }
                    }
                }
                Some(Err(reqwest_eventsource::Error::StreamEnded)) => {
                    debug!("delta_stream: stream ended");
                    es.close();
                    return None;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "delta_stream: stream broke off");
                    es.close();
                    return Some((Err(LlmError::Stream(e.to_string())), es));
                }
                None => return None,
            }
        }
    })
    .boxed()
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn stream(&self, request: CompletionRequest) -> Result<DeltaStream, LlmError> {
        debug!(%self.model, "OpenAIClient::stream: called");
        let body = self.build_request_body(&request);

        let builder = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = EventSource::new(builder).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        es.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        match es.next().await {
            Some(Ok(Event::Open)) => {
                info!(%self.model, "OpenAIClient::stream: stream opened");
                Ok(delta_stream(es))
            }
            Some(Ok(Event::Message(msg))) => {
                // Some servers skip straight to data; keep the first chunk
                debug!("OpenAIClient::stream: message before open");
                let first = parse_chunk(&msg.data).ok().flatten();
                let rest = delta_stream(es);
                Ok(match first {
                    Some(delta) => futures::stream::once(async move { Ok(delta) }).chain(rest).boxed(),
                    None => rest,
                })
            }
            Some(Err(e)) => {
                es.close();
                let err = establishment_error(e).await;
                warn!(error = %err, "OpenAIClient::stream: failed to open stream");
                Err(err)
            }
            None => Err(LlmError::InvalidResponse("stream closed before opening".to_string())),
        }
    }
}

// Streaming types

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamToolCall {
    index: Option<usize>,
    id: Option<String>,
    #[serde(rename = "type")]
    call_type: Option<String>,
    function: Option<OpenAIStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}
