//! Error types for call sessions

use crate::core::llm::LLMError;
use crate::core::stt::STTError;

/// The outbound side of the media stream is gone
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,
}

/// Why a generation turn stopped before completing
#[derive(Debug, Clone, thiserror::Error)]
pub enum TurnError {
    /// The turn was cancelled by barge-in, a newer turn, or session close.
    /// Expected control flow, never reported as a failure.
    #[error("Turn cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Generation error: {0}")]
    Generation(#[from] LLMError),
}

impl TurnError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TurnError::Cancelled)
    }
}

/// Error types for session lifecycle operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Transcription error: {0}")]
    Transcription(#[from] STTError),
}
