use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::booking::{BookingStore, BookingToolExecutor, JsonFileBookingStore};
use crate::core::llm::{LLMError, OpenAIConfig, OpenAIGenerator, ResponseGenerator};
use crate::core::session::{
    AudioSink, HangupPolicy, HangupScheduler, ResponsePipeline, SessionError, SessionHandle,
    SessionRegistry, TurnController,
};
use crate::core::stt::{DeepgramSTT, DeepgramSTTConfig, STTError, TranscriptionProvider};
use crate::core::telephony::{CallControl, NoopCallControl, TelephonyError, TwilioCallControl};
use crate::core::tts::{DeepgramTTS, DeepgramTTSConfig, SpeechSynthesizer, TTSError};

/// Errors raised while wiring up the core layer at startup
#[derive(Debug, thiserror::Error)]
pub enum CoreInitError {
    #[error("{0}")]
    MissingApiKey(String),

    #[error("STT initialization failed: {0}")]
    Transcription(#[from] STTError),

    #[error("TTS initialization failed: {0}")]
    Synthesis(#[from] TTSError),

    #[error("LLM initialization failed: {0}")]
    Generation(#[from] LLMError),

    #[error("Call control initialization failed: {0}")]
    Telephony(#[from] TelephonyError),
}

/// Adapters shared by every call session
pub struct Adapters {
    pub transcriber: Arc<dyn TranscriptionProvider>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub call_control: Arc<dyn CallControl>,
    pub bookings: Arc<dyn BookingStore>,
}

/// Core-specific shared state for the application.
///
/// Holds the provider adapters, the response pipeline they feed and the
/// registry of live call sessions.
pub struct CoreState {
    transcriber: Arc<dyn TranscriptionProvider>,
    pipeline: Arc<ResponsePipeline>,
    call_control: Arc<dyn CallControl>,
    bookings: Arc<dyn BookingStore>,
    sessions: SessionRegistry,
    system_prompt: String,
    hangup_policy: HangupPolicy,
}

impl CoreState {
    /// Build the production adapters from configuration
    ///
    /// Deepgram and OpenAI keys are required. Without Twilio credentials the
    /// call-control side only logs termination requests.
    pub async fn new(config: &ServerConfig) -> Result<Arc<Self>, CoreInitError> {
        let deepgram_key = config
            .get_api_key("deepgram")
            .map_err(CoreInitError::MissingApiKey)?;
        let openai_key = config
            .get_api_key("openai")
            .map_err(CoreInitError::MissingApiKey)?;

        let transcriber = DeepgramSTT::new(DeepgramSTTConfig {
            api_key: deepgram_key.clone(),
            model: config.stt_model.clone(),
            language: config.stt_language.clone(),
            sample_rate: config.audio_sample_rate,
            ..Default::default()
        })?;

        let synthesizer = DeepgramTTS::new(DeepgramTTSConfig {
            api_key: deepgram_key,
            voice: config.tts_voice.clone(),
            sample_rate: config.audio_sample_rate,
            ..Default::default()
        })?;

        let generator = OpenAIGenerator::new(OpenAIConfig {
            api_key: openai_key,
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            ..Default::default()
        })?;

        let call_control: Arc<dyn CallControl> = match (
            &config.twilio_account_sid,
            &config.twilio_auth_token,
        ) {
            (Some(sid), Some(token)) => {
                info!("Twilio call control enabled");
                Arc::new(TwilioCallControl::new(sid.clone(), token.clone())?)
            }
            _ => {
                warn!("Twilio credentials not configured; calls will not be hung up automatically");
                Arc::new(NoopCallControl)
            }
        };

        let bookings = Arc::new(JsonFileBookingStore::new(
            config.bookings_path.clone(),
            config.available_slots.clone(),
        ));
        info!("Bookings stored at {}", bookings.path().display());

        info!(
            "Initialized providers: STT={}, TTS={}, LLM={}",
            transcriber.provider_info(),
            synthesizer.provider_info(),
            config.openai_model
        );

        Ok(Self::with_adapters(
            config,
            Adapters {
                transcriber: Arc::new(transcriber),
                generator: Arc::new(generator),
                synthesizer: Arc::new(synthesizer),
                call_control,
                bookings,
            },
        ))
    }

    /// Build core state around explicit adapters
    pub fn with_adapters(config: &ServerConfig, adapters: Adapters) -> Arc<Self> {
        let tools = Arc::new(BookingToolExecutor::new(adapters.bookings.clone()));
        let pipeline = Arc::new(ResponsePipeline::new(
            adapters.generator,
            adapters.synthesizer,
            tools,
        ));

        Arc::new(Self {
            transcriber: adapters.transcriber,
            pipeline,
            call_control: adapters.call_control,
            bookings: adapters.bookings,
            sessions: SessionRegistry::new(),
            system_prompt: config.system_prompt.clone(),
            hangup_policy: HangupPolicy::from_config(config),
        })
    }

    pub fn bookings(&self) -> &Arc<dyn BookingStore> {
        &self.bookings
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Open transcription for a new call and start its session
    ///
    /// The session is not registered; the caller owns the returned handle.
    pub async fn open_session(
        &self,
        stream_id: &str,
        call_id: &str,
        sink: AudioSink,
    ) -> Result<SessionHandle, SessionError> {
        let stream = self.transcriber.open().await?;

        let hangup = HangupScheduler::new(self.call_control.clone(), self.hangup_policy);
        let controller = TurnController::new(
            call_id,
            self.system_prompt.clone(),
            sink,
            self.pipeline.clone(),
            hangup,
        );

        info!("Session started: stream={} call={}", stream_id, call_id);
        Ok(SessionHandle::spawn(
            stream_id,
            controller,
            stream.audio,
            stream.events,
        ))
    }
}
