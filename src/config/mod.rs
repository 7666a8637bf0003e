//! Configuration module for the receptionist server
//!
//! This module handles server configuration from two sources: YAML files and
//! environment variables. Values from a YAML file take priority over environment
//! variables, which take priority over built-in defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//! - `defaults`: Built-in prompt, greeting and slot defaults
//!
//! # Example
//! ```rust,no_run
//! use receptionist::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallbacks
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod defaults;
mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Server configuration
///
/// Contains all configuration needed to run the receptionist server:
/// - Server settings (host, port, public host for the media stream URL)
/// - Provider API keys (Deepgram, OpenAI-compatible LLM)
/// - Telephony control credentials (Twilio)
/// - Voice pipeline settings (STT model, TTS voice, telephony sample rate)
/// - Conversation settings (system prompt, greeting)
/// - Hangup grace periods
/// - Booking store settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Host used in the TwiML stream URL; falls back to the request `Host` header
    pub public_host: Option<String>,

    // Provider settings
    pub deepgram_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,

    // Telephony control
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,

    // Voice pipeline
    pub stt_model: String,
    pub stt_language: String,
    pub tts_voice: String,
    /// Sample rate of the 8-bit mu-law telephony audio, which is also its byte rate
    pub audio_sample_rate: u32,

    // Conversation
    pub system_prompt: String,
    pub greeting: String,

    // Hangup policy
    pub hangup_termination_grace_seconds: f64,
    pub hangup_booking_grace_seconds: f64,

    // Bookings
    pub bookings_path: PathBuf,
    pub available_slots: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_host: None,
            deepgram_api_key: None,
            openai_api_key: None,
            openai_base_url: defaults::OPENAI_BASE_URL.to_string(),
            openai_model: defaults::OPENAI_MODEL.to_string(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            stt_model: defaults::STT_MODEL.to_string(),
            stt_language: defaults::STT_LANGUAGE.to_string(),
            tts_voice: defaults::TTS_VOICE.to_string(),
            audio_sample_rate: defaults::AUDIO_SAMPLE_RATE,
            system_prompt: defaults::SYSTEM_PROMPT.to_string(),
            greeting: defaults::GREETING.to_string(),
            hangup_termination_grace_seconds: defaults::TERMINATION_GRACE_SECONDS,
            hangup_booking_grace_seconds: defaults::BOOKING_GRACE_SECONDS,
            bookings_path: PathBuf::from(defaults::BOOKINGS_PATH),
            available_slots: defaults::available_slots(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable fallbacks
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // The .env file is not loaded here: the YAML file is the source of truth and
        // only real environment variables fill the gaps.
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;

        validation::validate_config(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Twilio call control is configured
    pub fn has_twilio_credentials(&self) -> bool {
        self.twilio_account_sid.is_some() && self.twilio_auth_token.is_some()
    }

    /// Get API key for a specific provider
    ///
    /// # Arguments
    /// * `provider` - The name of the provider (e.g., "deepgram", "openai")
    ///
    /// # Returns
    /// * `Result<String, String>` - The API key on success, or an error message on failure
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        match provider.to_lowercase().as_str() {
            "deepgram" => self.deepgram_api_key.as_ref().cloned().ok_or_else(|| {
                "Deepgram API key not configured in server environment".to_string()
            }),
            "openai" => self.openai_api_key.as_ref().cloned().ok_or_else(|| {
                "OpenAI API key not configured in server environment".to_string()
            }),
            _ => Err(format!("Unsupported provider: {provider}")),
        }
    }
}
