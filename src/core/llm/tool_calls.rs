use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::core::conversation::ToolInvocation;

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Assembles streamed tool-call deltas keyed by invocation index
///
/// Ids and names arrive once, arguments arrive as JSON text fragments that are
/// only parseable once the stream has ended.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    partials: BTreeMap<u64, PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_delta(
        &mut self,
        index: u64,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        let entry = self.partials.entry(index).or_default();

        if let Some(id) = id.filter(|id| !id.is_empty()) {
            entry.id = id.to_string();
        }
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            entry.name = name.to_string();
        }
        if let Some(args) = arguments {
            entry.arguments.push_str(args);
        }
    }

    /// Apply one `delta.tool_calls` entry from a chat-completions chunk
    pub fn push_json(&mut self, tool_call: &Value) {
        let index = tool_call.get("index").and_then(Value::as_u64).unwrap_or(0);
        let function = tool_call.get("function");
        self.push_delta(
            index,
            tool_call.get("id").and_then(Value::as_str),
            function.and_then(|f| f.get("name")).and_then(Value::as_str),
            function
                .and_then(|f| f.get("arguments"))
                .and_then(Value::as_str),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    /// Finalize every accumulated call in index order
    pub fn finish(self) -> Vec<ToolInvocation> {
        self.partials
            .into_values()
            .map(|partial| {
                let arguments = parse_arguments(&partial.name, partial.arguments);
                ToolInvocation {
                    id: partial.id,
                    name: partial.name,
                    arguments,
                }
            })
            .collect()
    }
}

fn parse_arguments(name: &str, raw: String) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Map<String, Value>>(&raw) {
        Ok(map) => map,
        Err(e) => {
            warn!("Malformed arguments for tool {}: {}", name, e);
            let mut map = Map::new();
            map.insert("raw".to_string(), Value::String(raw));
            map
        }
    }
}
