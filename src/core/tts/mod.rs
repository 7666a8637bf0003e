mod base;
pub mod deepgram;

pub use base::{SpeechSynthesizer, TTSError, TTSResult};
pub use deepgram::{DEEPGRAM_TTS_URL, DeepgramTTS, DeepgramTTSConfig};
