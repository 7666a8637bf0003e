mod base;
pub mod openai;
pub mod tool_calls;

pub use base::{
    LLMError, LLMResult, ResponseEvent, ResponseGenerator, ResponseStream, ToolDefinition,
};
pub use openai::{OpenAIConfig, OpenAIGenerator};
pub use tool_calls::ToolCallAccumulator;
