//! # Deepgram TTS Implementation
//!
//! Sentence-at-a-time synthesis through the Deepgram Speak REST API. Audio is
//! requested directly in the telephony encoding (8 kHz mu-law) so it can be
//! forwarded to the caller without transcoding.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use tracing::{debug, error};
use url::Url;

use super::base::{SpeechSynthesizer, TTSError, TTSResult};

pub const DEEPGRAM_TTS_URL: &str = "https://api.deepgram.com/v1/speak";

/// Configuration for the Deepgram Speak API
#[derive(Debug, Clone)]
pub struct DeepgramTTSConfig {
    pub api_key: String,
    /// Speak endpoint; overridable for tests
    pub base_url: String,
    /// Voice model (e.g., "aura-asteria-en")
    pub voice: String,
    pub encoding: String,
    pub sample_rate: u32,
    pub request_timeout: Duration,
}

impl Default for DeepgramTTSConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEEPGRAM_TTS_URL.to_string(),
            voice: "aura-asteria-en".to_string(),
            encoding: "mulaw".to_string(),
            sample_rate: 8000,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Deepgram TTS provider implementation
pub struct DeepgramTTS {
    client: reqwest::Client,
    url: Url,
    api_key: String,
}

impl DeepgramTTS {
    /// Create a new Deepgram TTS instance
    pub fn new(config: DeepgramTTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "Deepgram API key is required".to_string(),
            ));
        }

        let mut url = Url::parse(&config.base_url)
            .map_err(|e| TTSError::InvalidConfiguration(format!("Invalid base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("model", &config.voice)
            .append_pair("encoding", &config.encoding)
            .append_pair("sample_rate", &config.sample_rate.to_string());

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(format!("HTTP client error: {e}")))?;

        Ok(Self {
            client,
            url,
            api_key: config.api_key,
        })
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for DeepgramTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes> {
        debug!("Synthesizing {} chars", text.len());

        let response = self
            .client
            .post(self.url.clone())
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TTSError::TimeoutError(e.to_string())
                } else {
                    TTSError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("TTS API error ({}): {}", status, error_body);
            return Err(TTSError::ProviderError(format!(
                "API error ({status}): {error_body}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read audio body: {e}")))
    }

    fn provider_info(&self) -> &'static str {
        "Deepgram Speak REST v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> DeepgramTTSConfig {
        DeepgramTTSConfig {
            api_key: "dg-test".to_string(),
            base_url: format!("{}/v1/speak", server.uri()),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            DeepgramTTS::new(DeepgramTTSConfig::default()),
            Err(TTSError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_synthesize_returns_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/speak"))
            .and(query_param("model", "aura-asteria-en"))
            .and(query_param("encoding", "mulaw"))
            .and(query_param("sample_rate", "8000"))
            .and(header("authorization", "Token dg-test"))
            .and(body_json(json!({"text": "Hello there."})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x7f; 800]))
            .expect(1)
            .mount(&server)
            .await;

        let tts = DeepgramTTS::new(config_for(&server)).unwrap();
        let audio = tts.synthesize("Hello there.").await.unwrap();
        assert_eq!(audio.len(), 800);
    }

    #[tokio::test]
    async fn test_synthesize_maps_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let tts = DeepgramTTS::new(config_for(&server)).unwrap();
        match tts.synthesize("Hi.").await {
            Err(TTSError::ProviderError(msg)) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("bad token"));
            }
            other => panic!("Expected ProviderError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_synthesize_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 10])
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let tts = DeepgramTTS::new(DeepgramTTSConfig {
            request_timeout: Duration::from_millis(50),
            ..config_for(&server)
        })
        .unwrap();

        assert!(matches!(
            tts.synthesize("Hi.").await,
            Err(TTSError::TimeoutError(_))
        ));
    }
}
