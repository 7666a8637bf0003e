use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. Environment variables fill
/// in any values not specified here.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///   public_host: "voice.example.com"
///
/// providers:
///   deepgram_api_key: "your-deepgram-key"
///   openai_api_key: "your-openai-key"
///   openai_base_url: "https://api.openai.com/v1"
///   openai_model: "gpt-4o-mini"
///
/// telephony:
///   twilio_account_sid: "AC..."
///   twilio_auth_token: "..."
///
/// voice:
///   stt_model: "nova-2"
///   stt_language: "en-US"
///   tts_voice: "aura-asteria-en"
///   sample_rate: 8000
///
/// conversation:
///   system_prompt: "You are a receptionist..."
///   greeting: "Welcome..."
///
/// hangup:
///   termination_grace_seconds: 1.0
///   booking_grace_seconds: 5.0
///
/// bookings:
///   path: "/var/lib/receptionist/bookings.json"
///   available_slots: ["09:00", "10:00", "14:00", "15:00"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub telephony: Option<TelephonyYaml>,
    pub voice: Option<VoiceYaml>,
    pub conversation: Option<ConversationYaml>,
    pub hangup: Option<HangupYaml>,
    pub bookings: Option<BookingsYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
}

/// Provider API keys and endpoints from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub deepgram_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
}

/// Telephony control credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelephonyYaml {
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
}

/// Voice pipeline settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoiceYaml {
    pub stt_model: Option<String>,
    pub stt_language: Option<String>,
    pub tts_voice: Option<String>,
    pub sample_rate: Option<u32>,
}

/// Conversation settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConversationYaml {
    pub system_prompt: Option<String>,
    pub greeting: Option<String>,
}

/// Hangup grace periods from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HangupYaml {
    pub termination_grace_seconds: Option<f64>,
    pub booking_grace_seconds: Option<f64>,
}

/// Booking store settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BookingsYaml {
    pub path: Option<String>,
    pub available_slots: Option<Vec<String>>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
