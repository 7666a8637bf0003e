use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};
use url::Url;

use super::base::{STTError, TranscriptEvent, TranscriptionProvider, TranscriptionStream};

const DEEPGRAM_LISTEN_URL: &str = "wss://api.deepgram.com/v1/listen";
const KEEP_ALIVE: &str = r#"{"type":"KeepAlive"}"#;
const CLOSE_STREAM: &str = r#"{"type":"CloseStream"}"#;
const CHANNEL_CAPACITY: usize = 256;

/// Configuration specific to Deepgram STT
#[derive(Debug, Clone)]
pub struct DeepgramSTTConfig {
    pub api_key: String,
    /// Listen endpoint; overridable for tests
    pub base_url: String,
    /// Deepgram model to use (e.g., "nova-2")
    pub model: String,
    pub language: String,
    /// Audio encoding of the inbound stream
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Enable smart formatting
    pub smart_format: bool,
    /// Enable interim results
    pub interim_results: bool,
    /// Silence gap in milliseconds that produces an `UtteranceEnd` message
    pub utterance_end_ms: Option<u32>,
    /// Voice activity detection events (`SpeechStarted`)
    pub vad_events: bool,
    /// Endpointing timeout in milliseconds
    pub endpointing: Option<u32>,
    /// Interval between `KeepAlive` messages while the call is silent
    pub keepalive_interval: Duration,
}

impl Default for DeepgramSTTConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEEPGRAM_LISTEN_URL.to_string(),
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            encoding: "mulaw".to_string(),
            sample_rate: 8000,
            channels: 1,
            smart_format: true,
            interim_results: true,
            utterance_end_ms: Some(1000),
            vad_events: true,
            endpointing: Some(800),
            keepalive_interval: Duration::from_secs(5),
        }
    }
}

/// Deepgram streaming response structure
#[derive(Debug, Deserialize)]
pub struct DeepgramResponse {
    #[serde(rename = "type")]
    pub response_type: String,
    pub channel: Option<DeepgramChannel>,
    pub is_final: Option<bool>,
    pub speech_final: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeepgramChannel {
    pub alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
pub struct DeepgramAlternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Deepgram error response structure
#[derive(Debug, Deserialize)]
pub struct DeepgramError {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Deepgram live transcription over WebSocket
pub struct DeepgramSTT {
    config: DeepgramSTTConfig,
}

impl DeepgramSTT {
    pub fn new(config: DeepgramSTTConfig) -> Result<Self, STTError> {
        if config.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "Deepgram API key is required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Build the WebSocket URL with query parameters
    fn build_websocket_url(&self) -> Result<Url, STTError> {
        let config = &self.config;
        let mut url = Url::parse(&config.base_url)
            .map_err(|e| STTError::ConfigurationError(format!("Invalid WebSocket URL: {e}")))?;

        {
            let mut query_pairs = url.query_pairs_mut();

            query_pairs.append_pair("model", &config.model);
            query_pairs.append_pair("language", &config.language);

            // Audio settings
            query_pairs.append_pair("encoding", &config.encoding);
            query_pairs.append_pair("sample_rate", &config.sample_rate.to_string());
            query_pairs.append_pair("channels", &config.channels.to_string());

            // Feature flags
            query_pairs.append_pair("smart_format", &config.smart_format.to_string());
            query_pairs.append_pair("interim_results", &config.interim_results.to_string());
            query_pairs.append_pair("vad_events", &config.vad_events.to_string());

            if let Some(utterance_end_ms) = config.utterance_end_ms {
                query_pairs.append_pair("utterance_end_ms", &utterance_end_ms.to_string());
            }

            if let Some(endpointing) = config.endpointing {
                query_pairs.append_pair("endpointing", &endpointing.to_string());
            }
        }

        Ok(url)
    }
}

/// Translate one Deepgram text message into transcript events
pub fn parse_message(text: &str) -> Result<Vec<TranscriptEvent>, STTError> {
    let response: DeepgramResponse = serde_json::from_str(text)
        .map_err(|e| STTError::ProviderError(format!("Failed to parse response: {e}")))?;

    let mut events = Vec::new();
    match response.response_type.as_str() {
        "Results" => {
            let transcript = response
                .channel
                .as_ref()
                .and_then(|c| c.alternatives.first())
                .map(|a| a.transcript.trim())
                .unwrap_or_default();

            if !transcript.is_empty() {
                if response.is_final.unwrap_or(false) {
                    events.push(TranscriptEvent::Final(transcript.to_string()));
                } else {
                    events.push(TranscriptEvent::Partial(transcript.to_string()));
                }
            }

            if response.speech_final.unwrap_or(false) {
                events.push(TranscriptEvent::SpeechFinal);
            }
        }
        "SpeechStarted" => events.push(TranscriptEvent::SpeechStarted),
        "UtteranceEnd" => events.push(TranscriptEvent::UtteranceEnd),
        "Metadata" => events.push(TranscriptEvent::Metadata),
        "Error" => {
            let error_msg = serde_json::from_str::<DeepgramError>(text)
                .ok()
                .and_then(|e| e.description.or(e.message))
                .unwrap_or_else(|| "Unknown error from Deepgram".to_string());
            return Err(STTError::ProviderError(error_msg));
        }
        other => {
            warn!("Unknown Deepgram response type: {}", other);
        }
    }

    Ok(events)
}

#[async_trait::async_trait]
impl TranscriptionProvider for DeepgramSTT {
    async fn open(&self) -> Result<TranscriptionStream, STTError> {
        let url = self.build_websocket_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| STTError::ConfigurationError(format!("Invalid request: {e}")))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.config.api_key))
            .map_err(|e| STTError::AuthenticationFailed(format!("Invalid API key: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| STTError::ConnectionFailed(format!("Deepgram connect failed: {e}")))?;

        info!("Connected to Deepgram WebSocket");

        let (stream, audio_rx, events_tx) = TranscriptionStream::channel(CHANNEL_CAPACITY);
        tokio::spawn(run_connection(
            ws_stream,
            audio_rx,
            events_tx,
            self.config.keepalive_interval,
        ));

        Ok(stream)
    }

    fn provider_info(&self) -> &'static str {
        "Deepgram STT WebSocket v1"
    }
}

async fn run_connection<S>(
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
    mut audio_rx: mpsc::Receiver<Bytes>,
    events_tx: mpsc::Sender<TranscriptEvent>,
    keepalive_interval: Duration,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let mut keepalive = tokio::time::interval(keepalive_interval);
    keepalive.tick().await;

    loop {
        tokio::select! {
            audio = audio_rx.recv() => {
                match audio {
                    Some(chunk) => {
                        if let Err(e) = ws_sink.send(Message::Binary(chunk)).await {
                            error!("Failed to send audio to Deepgram: {}", e);
                            break;
                        }
                    }
                    None => {
                        debug!("Audio input closed, sending CloseStream");
                        let _ = ws_sink.send(Message::Text(CLOSE_STREAM.to_string().into())).await;
                        break;
                    }
                }
            }

            _ = keepalive.tick() => {
                if let Err(e) = ws_sink.send(Message::Text(KEEP_ALIVE.to_string().into())).await {
                    error!("Failed to send KeepAlive: {}", e);
                    break;
                }
            }

            message = ws_stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let events = match parse_message(&text) {
                            Ok(events) => events,
                            Err(e) => {
                                warn!("Deepgram message error: {}", e);
                                continue;
                            }
                        };
                        for event in events {
                            if events_tx.send(event).await.is_err() {
                                debug!("Transcript receiver dropped");
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Deepgram connection closed: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Deepgram WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!("Deepgram stream ended");
                        break;
                    }
                }
            }
        }
    }

    let _ = ws_sink.close().await;
    info!("Deepgram WebSocket connection closed");
}
