use bytes::Bytes;

/// Error types for TTS operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Base trait for Text-to-Speech providers
///
/// One call synthesizes one sentence into one complete audio payload in the
/// telephony encoding. Implementations must be safe to call concurrently from
/// many sessions.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes>;

    /// Get provider-specific information
    fn provider_info(&self) -> &'static str;
}
