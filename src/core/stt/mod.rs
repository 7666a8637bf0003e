mod base;
pub mod deepgram;

// Re-export public types and traits
pub use base::{STTError, TranscriptEvent, TranscriptionProvider, TranscriptionStream};

// Re-export Deepgram implementation
pub use deepgram::{DeepgramSTT, DeepgramSTTConfig};
