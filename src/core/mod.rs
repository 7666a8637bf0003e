pub mod booking;
pub mod conversation;
pub mod llm;
pub mod segmenter;
pub mod session;
pub mod state;
pub mod stt;
pub mod telephony;
pub mod tts;

// Re-export commonly used types for convenience
pub use booking::{Booking, BookingError, BookingStore, JsonFileBookingStore, MemoryBookingStore};
pub use conversation::{ConversationHistory, ToolInvocation, Turn};
pub use llm::{LLMError, OpenAIGenerator, ResponseGenerator};
pub use session::{
    ResponsePipeline, SessionError, SessionHandle, SessionRegistry, SessionState, TurnController,
};
pub use stt::{DeepgramSTT, STTError, TranscriptEvent, TranscriptionProvider};
pub use telephony::{CallControl, NoopCallControl, TelephonyError, TwilioCallControl};
pub use tts::{DeepgramTTS, SpeechSynthesizer, TTSError};

// Re-export CoreState for external use
pub use state::CoreState;
