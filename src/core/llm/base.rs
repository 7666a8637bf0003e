use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::core::conversation::{ToolInvocation, Turn};

/// Error types for response generation
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type LLMResult<T> = Result<T, LLMError>;

/// A tool offered to the language model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool's arguments
    pub parameters: Value,
}

/// A chunk of a streamed response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEvent {
    /// Incremental text content
    TextDelta(String),
    /// Tool calls assembled from the stream, in invocation-index order
    ToolCalls(Vec<ToolInvocation>),
}

/// Handle to a streaming response
///
/// The stream is complete when [`next`](ResponseStream::next) returns `None`.
/// Dropping the handle stops the underlying request.
pub struct ResponseStream {
    rx: mpsc::Receiver<LLMResult<ResponseEvent>>,
}

impl ResponseStream {
    pub fn channel(capacity: usize) -> (mpsc::Sender<LLMResult<ResponseEvent>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    pub async fn next(&mut self) -> Option<LLMResult<ResponseEvent>> {
        self.rx.recv().await
    }
}

/// Base trait for response generators
#[async_trait::async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Start generating a reply to `history`
    ///
    /// `tools` is `None` when the model must answer in text only.
    async fn generate(
        &self,
        history: &[Turn],
        tools: Option<&[ToolDefinition]>,
    ) -> LLMResult<ResponseStream>;
}
