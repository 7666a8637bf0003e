//! OpenAI-compatible chat-completions client with SSE streaming.

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::base::{
    LLMError, LLMResult, ResponseEvent, ResponseGenerator, ResponseStream, ToolDefinition,
};
use super::tool_calls::ToolCallAccumulator;
use crate::core::conversation::Turn;

const STREAM_CAPACITY: usize = 64;

/// Configuration for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    pub connect_timeout: Duration,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Streaming response generator backed by `/chat/completions`
pub struct OpenAIGenerator {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIGenerator {
    pub fn new(config: OpenAIConfig) -> LLMResult<Self> {
        if config.api_key.is_empty() {
            return Err(LLMError::InvalidConfiguration(
                "OpenAI API key is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| LLMError::InvalidConfiguration(format!("HTTP client error: {e}")))?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request_body(&self, history: &[Turn], tools: Option<&[ToolDefinition]>) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": history.iter().map(turn_to_message).collect::<Vec<_>>(),
            "stream": true,
        });

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = Value::Array(tools.iter().map(tool_to_json).collect());
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

/// Convert a history turn into a chat-completions message
pub fn turn_to_message(turn: &Turn) -> Value {
    match turn {
        Turn::System { content } => json!({"role": "system", "content": content}),
        Turn::User { content } => json!({"role": "user", "content": content}),
        Turn::Assistant {
            content,
            tool_calls,
        } => {
            if tool_calls.is_empty() {
                return json!({"role": "assistant", "content": content});
            }

            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": Value::Object(call.arguments.clone()).to_string(),
                        }
                    })
                })
                .collect();

            let content = if content.is_empty() {
                Value::Null
            } else {
                json!(content)
            };
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        Turn::ToolResult {
            invocation_id,
            content,
        } => json!({"role": "tool", "tool_call_id": invocation_id, "content": content}),
    }
}

fn tool_to_json(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

#[async_trait::async_trait]
impl ResponseGenerator for OpenAIGenerator {
    async fn generate(
        &self,
        history: &[Turn],
        tools: Option<&[ToolDefinition]>,
    ) -> LLMResult<ResponseStream> {
        let body = self.build_request_body(history, tools);
        debug!(
            "Requesting completion: {} messages, tools={}",
            history.len(),
            tools.is_some()
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("LLM API error ({}): {}", status, body);
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, stream) = ResponseStream::channel(STREAM_CAPACITY);
        tokio::spawn(parse_sse_stream(response.bytes_stream(), tx));
        Ok(stream)
    }
}

/// Parse a chat-completions SSE body into response events
///
/// Text deltas are forwarded as they arrive. Tool calls are accumulated and
/// sent as one event when the stream finishes. Returns early once the receiver
/// is dropped.
pub async fn parse_sse_stream<S, B, E>(byte_stream: S, tx: mpsc::Sender<LLMResult<ResponseEvent>>)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut tool_calls = ToolCallAccumulator::new();
    let mut stream = Box::pin(byte_stream.eventsource());

    while let Some(result) = stream.next().await {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                warn!("SSE stream error: {}", e);
                let _ = tx.send(Err(LLMError::StreamError(e.to_string()))).await;
                return;
            }
        };

        let data = event.data.trim();
        if data.is_empty() {
            continue;
        }
        if data == "[DONE]" {
            break;
        }

        let chunk: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                debug!("SSE parse error (skipping chunk): {}", e);
                continue;
            }
        };

        let Some(delta) = chunk
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("delta"))
        else {
            continue;
        };

        if let Some(content) = delta.get("content").and_then(Value::as_str)
            && !content.is_empty()
            && tx
                .send(Ok(ResponseEvent::TextDelta(content.to_string())))
                .await
                .is_err()
        {
            return;
        }

        if let Some(deltas) = delta.get("tool_calls").and_then(Value::as_array) {
            for tool_call in deltas {
                tool_calls.push_json(tool_call);
            }
        }
    }

    if !tool_calls.is_empty() {
        let _ = tx
            .send(Ok(ResponseEvent::ToolCalls(tool_calls.finish())))
            .await;
    }
}
