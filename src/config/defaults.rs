//! Built-in defaults for the receptionist configuration.

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

pub const STT_MODEL: &str = "nova-2";
pub const STT_LANGUAGE: &str = "en-US";
pub const TTS_VOICE: &str = "aura-asteria-en";

/// Twilio media streams carry 8 kHz mono mu-law, one byte per sample.
pub const AUDIO_SAMPLE_RATE: u32 = 8000;

pub const TERMINATION_GRACE_SECONDS: f64 = 1.0;
pub const BOOKING_GRACE_SECONDS: f64 = 5.0;

pub const BOOKINGS_PATH: &str = "bookings.json";

pub const GREETING: &str = "Welcome to HealthCenter One administrative services. How may I assist you with your appointment today?";

pub const SYSTEM_PROMPT: &str = r#"You are a professional medical administrative assistant for HealthCenter One. Your objective is to manage patient inquiries and finalize bookings.

STRICT DATA EXTRACTION RULES:
1. FULL NAME: You must extract the patient's FULL NAME (First and Last). If they give only a first name, ASK for their last name. DO NOT use words like "Yes", "Hello", or "Okay" as a name.
2. DETAILS: You need a Date, a Time, and a Reason for the visit.
3. CONFIRMATION: Only call the 'book_appointment' tool AFTER you have all 3 items and the FULL NAME.
4. CLOSING: After confirming a booking, ALWAYS ask if there is anything else you can help with.
5. TERMINATION: If the user says "No", "Goodbye", "No thanks", or indicates they are finished, use the 'terminate_call' tool and give a final farewell.
6. CONCISENESS: Maintain a formal, helpful tone but keep responses very concise for voice interaction.

Opening hours are Monday to Friday, 8am to 6pm. You must NOT provide medical advice or diagnosis. If the caller describes an emergency, tell them to hang up and dial emergency services immediately."#;

const AVAILABLE_SLOTS: [&str; 4] = ["09:00", "10:00", "14:00", "15:00"];

/// Daily appointment slots offered when nothing else is configured.
pub fn available_slots() -> Vec<String> {
    AVAILABLE_SLOTS.iter().map(|s| s.to_string()).collect()
}
