use bytes::Bytes;
use tokio::sync::mpsc;

/// Transcript events surfaced by a live transcription stream
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    /// Interim hypothesis that may still change; never appended to an utterance
    Partial(String),
    /// Stable transcript fragment for a span of audio
    Final(String),
    /// The caller started speaking
    SpeechStarted,
    /// End of speech detected by the engine's endpointing
    SpeechFinal,
    /// Silence gap after the last word (utterance boundary)
    UtteranceEnd,
    /// Engine metadata; carries nothing the session uses
    Metadata,
}

/// Error types for STT operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Both ends of one live transcription session
///
/// Dropping `audio` tells the provider that no more audio will follow; the
/// `events` receiver yields `None` once the provider connection is gone.
pub struct TranscriptionStream {
    pub audio: mpsc::Sender<Bytes>,
    pub events: mpsc::Receiver<TranscriptEvent>,
}

impl TranscriptionStream {
    /// Create a stream pair and return the provider-side ends
    ///
    /// Provider implementations keep the returned receiver/sender and hand the
    /// stream to the session.
    pub fn channel(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Receiver<Bytes>,
        mpsc::Sender<TranscriptEvent>,
    ) {
        let (audio_tx, audio_rx) = mpsc::channel(capacity);
        let (events_tx, events_rx) = mpsc::channel(capacity);
        (
            Self {
                audio: audio_tx,
                events: events_rx,
            },
            audio_rx,
            events_tx,
        )
    }
}

/// Base trait for Speech-to-Text providers
///
/// One call to [`open`](TranscriptionProvider::open) is one live transcription
/// session; a phone call opens exactly one.
#[async_trait::async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Open a live transcription session
    ///
    /// # Returns
    /// * `Result<TranscriptionStream, STTError>` - Audio input and event output ends, or error
    async fn open(&self) -> Result<TranscriptionStream, STTError>;

    /// Get provider-specific information
    fn provider_info(&self) -> &'static str;
}
