//! Call control: ending an active phone call.

pub mod twilio;

use tracing::warn;

pub use twilio::{TWILIO_API_URL, TwilioCallControl};

/// Error types for call control operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum TelephonyError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Telephony-side control of a live call
#[async_trait::async_trait]
pub trait CallControl: Send + Sync {
    /// Hang up the call identified by `call_id`
    async fn terminate(&self, call_id: &str) -> Result<(), TelephonyError>;
}

/// Call control used when no telephony credentials are configured
///
/// Logs the request and reports success, leaving the caller to hang up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallControl;

#[async_trait::async_trait]
impl CallControl for NoopCallControl {
    async fn terminate(&self, call_id: &str) -> Result<(), TelephonyError> {
        warn!(
            "Call control not configured; not terminating call {}",
            call_id
        );
        Ok(())
    }
}
