use chrono::NaiveTime;

use super::ServerConfig;

/// Validate the merged configuration
///
/// Validates that:
/// - Twilio account SID and auth token are configured together
/// - hangup grace periods are finite and non-negative
/// - the telephony sample rate is non-zero
/// - every available slot is an `HH:MM` time
pub fn validate_config(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_twilio_credentials(&config.twilio_account_sid, &config.twilio_auth_token)?;

    validate_grace(
        "termination_grace_seconds",
        config.hangup_termination_grace_seconds,
    )?;
    validate_grace("booking_grace_seconds", config.hangup_booking_grace_seconds)?;

    if config.audio_sample_rate == 0 {
        return Err("audio sample_rate must be greater than zero".into());
    }

    validate_slots(&config.available_slots)?;

    Ok(())
}

/// If either Twilio credential is set, both must be set
fn validate_twilio_credentials(
    account_sid: &Option<String>,
    auth_token: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    match (account_sid, auth_token) {
        (Some(_), None) => {
            Err("TWILIO_AUTH_TOKEN is required when TWILIO_ACCOUNT_SID is set".into())
        }
        (None, Some(_)) => {
            Err("TWILIO_ACCOUNT_SID is required when TWILIO_AUTH_TOKEN is set".into())
        }
        _ => Ok(()),
    }
}

fn validate_grace(name: &str, seconds: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("hangup {name} must be a non-negative number, got {seconds}").into());
    }
    Ok(())
}

fn validate_slots(slots: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if slots.is_empty() {
        return Err("bookings available_slots cannot be empty".into());
    }

    for slot in slots {
        NaiveTime::parse_from_str(slot, "%H:%M")
            .map_err(|_| format!("Invalid available slot '{slot}': expected HH:MM"))?;
    }

    Ok(())
}
