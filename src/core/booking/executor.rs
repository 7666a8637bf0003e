use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};

use super::models::{Booking, NewBooking};
use super::store::BookingStore;
use crate::core::conversation::ToolInvocation;
use crate::core::llm::ToolDefinition;

pub const CHECK_AVAILABILITY: &str = "check_availability";
pub const BOOK_APPOINTMENT: &str = "book_appointment";
pub const TERMINATE_CALL: &str = "terminate_call";

/// Session-level consequence of a resolved tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEffect {
    Booked(Booking),
    TerminateRequested,
}

/// Result of one tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// JSON text returned to the model as the tool result
    pub content: String,
    pub effect: Option<ToolEffect>,
}

impl ToolOutcome {
    fn reply(value: Value) -> Self {
        Self {
            content: value.to_string(),
            effect: None,
        }
    }

    fn with_effect(value: Value, effect: ToolEffect) -> Self {
        Self {
            content: value.to_string(),
            effect: Some(effect),
        }
    }
}

/// Resolves booking tool calls against a [`BookingStore`]
///
/// Store failures never escape: they come back as a failing tool result so
/// the model can tell the caller.
pub struct BookingToolExecutor {
    store: Arc<dyn BookingStore>,
}

impl BookingToolExecutor {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    /// Definitions offered on the first generation pass
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: CHECK_AVAILABILITY.to_string(),
                description: "Check available appointment slots for a specific date".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "date": {"type": "string", "description": "YYYY-MM-DD format"}
                    },
                    "required": ["date"]
                }),
            },
            ToolDefinition {
                name: BOOK_APPOINTMENT.to_string(),
                description: "Book a new appointment".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Patient full name"},
                        "datetime": {"type": "string", "description": "YYYY-MM-DD HH:MM format"},
                        "reason": {"type": "string", "description": "Reason for visit"}
                    },
                    "required": ["name", "datetime"]
                }),
            },
            ToolDefinition {
                name: TERMINATE_CALL.to_string(),
                description:
                    "Ends the call when the user is finished and no more assistance is needed."
                        .to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
        ]
    }

    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        match invocation.name.as_str() {
            CHECK_AVAILABILITY => self.check_availability(invocation).await,
            BOOK_APPOINTMENT => self.book_appointment(invocation).await,
            TERMINATE_CALL => {
                info!("Call termination requested");
                ToolOutcome::with_effect(
                    json!({"status": "Call termination initiated."}),
                    ToolEffect::TerminateRequested,
                )
            }
            other => {
                warn!("Unknown tool requested: {}", other);
                ToolOutcome::reply(json!({"error": format!("Unknown tool: {other}")}))
            }
        }
    }

    async fn check_availability(&self, invocation: &ToolInvocation) -> ToolOutcome {
        // A missing date is treated like a malformed one
        let Some(date) = invocation.str_arg("date") else {
            return ToolOutcome::reply(json!([]));
        };

        match self.store.available_slots(date).await {
            Ok(slots) => ToolOutcome::reply(json!(slots)),
            Err(e) => {
                warn!("Availability lookup failed: {}", e);
                ToolOutcome::reply(json!({"status": "failed", "error": e.to_string()}))
            }
        }
    }

    async fn book_appointment(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let Some(name) = invocation.str_arg("name") else {
            return missing_argument("name");
        };
        let Some(datetime) = invocation.str_arg("datetime") else {
            return missing_argument("datetime");
        };

        let request = NewBooking {
            name: name.to_string(),
            datetime: datetime.to_string(),
            reason: invocation.str_arg("reason").map(str::to_string),
        };

        match self.store.create(request).await {
            Ok(booking) => {
                info!("Booking {} confirmed for {}", booking.id, booking.datetime);
                let value = serde_json::to_value(&booking)
                    .unwrap_or_else(|_| json!({"id": booking.id, "status": "confirmed"}));
                ToolOutcome::with_effect(value, ToolEffect::Booked(booking))
            }
            Err(e) => {
                warn!("Booking failed: {}", e);
                ToolOutcome::reply(json!({"status": "failed", "error": e.to_string()}))
            }
        }
    }
}

fn missing_argument(name: &str) -> ToolOutcome {
    ToolOutcome::reply(json!({"error": format!("Missing required argument: {name}")}))
}
