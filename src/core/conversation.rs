//! Conversation history shared by the turn controller, the response generator
//! and the booking tools.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool call requested by the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// String argument by name, ignoring blank values
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocation>,
    },
    ToolResult {
        invocation_id: String,
        content: String,
    },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Turn::System { content }
            | Turn::User { content }
            | Turn::Assistant { content, .. }
            | Turn::ToolResult { content, .. } => content,
        }
    }
}

/// Append-only conversation history that always starts with the system turn
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::System {
                content: system_prompt.into(),
            }],
        }
    }

    /// Append a turn. A system turn after the first one is rejected.
    pub fn push(&mut self, turn: Turn) {
        if matches!(turn, Turn::System { .. }) {
            tracing::warn!("Ignoring additional system turn");
            return;
        }
        self.turns.push(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        for turn in turns {
            self.push(turn);
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_starts_with_system() {
        let history = ConversationHistory::new("be brief");
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.turns()[0],
            Turn::System {
                content: "be brief".to_string()
            }
        );
    }

    #[test]
    fn test_history_rejects_second_system_turn() {
        let mut history = ConversationHistory::new("be brief");
        history.push(Turn::user("hi"));
        history.push(Turn::System {
            content: "override".to_string(),
        });
        history.push(Turn::assistant("hello"));

        assert_eq!(history.len(), 3);
        assert!(matches!(history.turns()[0], Turn::System { .. }));
        assert_eq!(history.last().map(Turn::content), Some("hello"));
    }

    #[test]
    fn test_invocation_arguments() {
        let invocation = ToolInvocation::new(
            "call_1",
            "book_appointment",
            json!({"name": "Jane Doe", "reason": "  ", "datetime": 5}),
        );
        assert_eq!(invocation.str_arg("name"), Some("Jane Doe"));
        assert_eq!(invocation.str_arg("reason"), None);
        assert_eq!(invocation.str_arg("datetime"), None);

        let no_args = ToolInvocation::new("call_2", "terminate_call", json!("raw"));
        assert!(no_args.arguments.is_empty());
    }
}
