use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;
use super::defaults;
use super::utils::parse_list;
use super::yaml::YamlConfig;

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// This allows environment variables to provide base configuration while YAML
/// can override specific values for different deployment environments.
///
/// # Arguments
/// * `yaml_config` - Optional YAML configuration to use as overrides
///
/// # Returns
/// * `Result<ServerConfig, Box<dyn std::error::Error>>` - The merged configuration or an error
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();

    // Helper macro to get value with priority: YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            $yaml_value
                .or_else(|| env::var($env_var).ok())
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Helper macro for optional values: YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            $yaml_value.or_else(|| env::var($env_var).ok())
        };
    }

    // Server configuration
    let host = get_value!(
        "HOST",
        yaml.server.as_ref().and_then(|s| s.host.clone()),
        "0.0.0.0"
    );

    let port = get_parsed(
        "PORT",
        yaml.server.as_ref().and_then(|s| s.port),
        5000u16,
    )?;

    let public_host = get_optional!(
        "PUBLIC_HOST",
        yaml.server.as_ref().and_then(|s| s.public_host.clone())
    );

    // Provider configuration
    let deepgram_api_key = get_optional!(
        "DEEPGRAM_API_KEY",
        yaml.providers
            .as_ref()
            .and_then(|p| p.deepgram_api_key.clone())
    );

    let openai_api_key = get_optional!(
        "OPENAI_API_KEY",
        yaml.providers.as_ref().and_then(|p| p.openai_api_key.clone())
    );

    let openai_base_url = get_value!(
        "OPENAI_BASE_URL",
        yaml.providers
            .as_ref()
            .and_then(|p| p.openai_base_url.clone()),
        defaults::OPENAI_BASE_URL
    );

    let openai_model = get_value!(
        "OPENAI_MODEL",
        yaml.providers.as_ref().and_then(|p| p.openai_model.clone()),
        defaults::OPENAI_MODEL
    );

    // Telephony control
    let twilio_account_sid = get_optional!(
        "TWILIO_ACCOUNT_SID",
        yaml.telephony
            .as_ref()
            .and_then(|t| t.twilio_account_sid.clone())
    );

    let twilio_auth_token = get_optional!(
        "TWILIO_AUTH_TOKEN",
        yaml.telephony
            .as_ref()
            .and_then(|t| t.twilio_auth_token.clone())
    );

    // Voice pipeline
    let stt_model = get_value!(
        "STT_MODEL",
        yaml.voice.as_ref().and_then(|v| v.stt_model.clone()),
        defaults::STT_MODEL
    );

    let stt_language = get_value!(
        "STT_LANGUAGE",
        yaml.voice.as_ref().and_then(|v| v.stt_language.clone()),
        defaults::STT_LANGUAGE
    );

    let tts_voice = get_value!(
        "TTS_VOICE",
        yaml.voice.as_ref().and_then(|v| v.tts_voice.clone()),
        defaults::TTS_VOICE
    );

    let audio_sample_rate = get_parsed(
        "AUDIO_SAMPLE_RATE",
        yaml.voice.as_ref().and_then(|v| v.sample_rate),
        defaults::AUDIO_SAMPLE_RATE,
    )?;

    // Conversation
    let system_prompt = get_value!(
        "SYSTEM_PROMPT",
        yaml.conversation
            .as_ref()
            .and_then(|c| c.system_prompt.clone()),
        defaults::SYSTEM_PROMPT
    );

    let greeting = get_value!(
        "GREETING",
        yaml.conversation.as_ref().and_then(|c| c.greeting.clone()),
        defaults::GREETING
    );

    // Hangup policy
    let hangup_termination_grace_seconds = get_parsed(
        "HANGUP_TERMINATION_GRACE_SECONDS",
        yaml.hangup
            .as_ref()
            .and_then(|h| h.termination_grace_seconds),
        defaults::TERMINATION_GRACE_SECONDS,
    )?;

    let hangup_booking_grace_seconds = get_parsed(
        "HANGUP_BOOKING_GRACE_SECONDS",
        yaml.hangup.as_ref().and_then(|h| h.booking_grace_seconds),
        defaults::BOOKING_GRACE_SECONDS,
    )?;

    // Bookings
    let bookings_path = PathBuf::from(get_value!(
        "BOOKINGS_PATH",
        yaml.bookings.as_ref().and_then(|b| b.path.clone()),
        defaults::BOOKINGS_PATH
    ));

    // An empty YAML list falls back to ENV, then defaults
    let available_slots = yaml
        .bookings
        .as_ref()
        .and_then(|b| b.available_slots.clone())
        .filter(|slots| !slots.is_empty())
        .or_else(|| {
            env::var("AVAILABLE_SLOTS")
                .ok()
                .map(|v| parse_list(&v))
                .filter(|slots| !slots.is_empty())
        })
        .unwrap_or_else(defaults::available_slots);

    Ok(ServerConfig {
        host,
        port,
        public_host,
        deepgram_api_key,
        openai_api_key,
        openai_base_url,
        openai_model,
        twilio_account_sid,
        twilio_auth_token,
        stt_model,
        stt_language,
        tts_voice,
        audio_sample_rate,
        system_prompt,
        greeting,
        hangup_termination_grace_seconds,
        hangup_booking_grace_seconds,
        bookings_path,
        available_slots,
    })
}

/// Resolve a typed value with priority YAML > ENV > default, rejecting malformed ENV values
fn get_parsed<T>(
    env_var: &str,
    yaml_value: Option<T>,
    default: T,
) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = yaml_value {
        return Ok(value);
    }

    match env::var(env_var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid {env_var} environment variable: {e}").into()),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::super::yaml::{BookingsYaml, HangupYaml, ProvidersYaml, ServerYaml};
    use super::*;
    use serial_test::serial;

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            env::remove_var("HOST");
            env::remove_var("PORT");
            env::remove_var("PUBLIC_HOST");
            env::remove_var("DEEPGRAM_API_KEY");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("OPENAI_MODEL");
            env::remove_var("OPENAI_BASE_URL");
            env::remove_var("TWILIO_ACCOUNT_SID");
            env::remove_var("TWILIO_AUTH_TOKEN");
            env::remove_var("AUDIO_SAMPLE_RATE");
            env::remove_var("HANGUP_TERMINATION_GRACE_SECONDS");
            env::remove_var("HANGUP_BOOKING_GRACE_SECONDS");
            env::remove_var("BOOKINGS_PATH");
            env::remove_var("AVAILABLE_SLOTS");
        }
    }

    #[test]
    #[serial]
    fn test_merge_defaults_when_no_yaml_or_env() {
        cleanup_env_vars();

        let config = merge_config(None).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.audio_sample_rate, 8000);
        assert_eq!(config.hangup_termination_grace_seconds, 1.0);
        assert_eq!(config.hangup_booking_grace_seconds, 5.0);
        assert_eq!(config.bookings_path, PathBuf::from("bookings.json"));
        assert_eq!(
            config.available_slots,
            vec!["09:00", "10:00", "14:00", "15:00"]
        );
        assert!(config.deepgram_api_key.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_yaml_overrides_env() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                host: Some("127.0.0.1".to_string()),
                port: Some(8080),
                public_host: None,
            }),
            providers: Some(ProvidersYaml {
                openai_model: Some("gpt-4o".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("PORT", "9000");
            env::set_var("OPENAI_MODEL", "env-model");
            env::set_var("PUBLIC_HOST", "env.example.com");
        }

        let config = merge_config(Some(yaml)).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_model, "gpt-4o");
        // ENV fills what YAML leaves out
        assert_eq!(config.public_host, Some("env.example.com".to_string()));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_env_numeric_values() {
        cleanup_env_vars();

        unsafe {
            env::set_var("AUDIO_SAMPLE_RATE", "16000");
            env::set_var("HANGUP_TERMINATION_GRACE_SECONDS", "0.25");
            env::set_var("HANGUP_BOOKING_GRACE_SECONDS", "7");
        }

        let config = merge_config(None).unwrap();

        assert_eq!(config.audio_sample_rate, 16000);
        assert_eq!(config.hangup_termination_grace_seconds, 0.25);
        assert_eq!(config.hangup_booking_grace_seconds, 7.0);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_invalid_env_port() {
        cleanup_env_vars();

        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let result = merge_config(None);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid PORT environment variable")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_invalid_env_grace() {
        cleanup_env_vars();

        unsafe {
            env::set_var("HANGUP_BOOKING_GRACE_SECONDS", "soon");
        }

        let result = merge_config(None);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("HANGUP_BOOKING_GRACE_SECONDS")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_hangup_partial_yaml() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            hangup: Some(HangupYaml {
                booking_grace_seconds: Some(3.0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = merge_config(Some(yaml)).unwrap();

        assert_eq!(config.hangup_termination_grace_seconds, 1.0); // default
        assert_eq!(config.hangup_booking_grace_seconds, 3.0); // from yaml

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_available_slots_from_env() {
        cleanup_env_vars();

        unsafe {
            env::set_var("AVAILABLE_SLOTS", "08:00, 12:30 ,16:00");
        }

        let config = merge_config(None).unwrap();
        assert_eq!(config.available_slots, vec!["08:00", "12:30", "16:00"]);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_merge_empty_yaml_slots_fall_back_to_env() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            bookings: Some(BookingsYaml {
                path: Some("/tmp/clinic.json".to_string()),
                available_slots: Some(vec![]),
            }),
            ..Default::default()
        };

        unsafe {
            env::set_var("AVAILABLE_SLOTS", "11:00");
        }

        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.bookings_path, PathBuf::from("/tmp/clinic.json"));
        assert_eq!(config.available_slots, vec!["11:00"]);

        cleanup_env_vars();
    }
}
