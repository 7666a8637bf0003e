//! # Media Stream Handler Module
//!
//! WebSocket endpoint the telephony provider streams a live call to.
//!
//! ## Connection Flow
//! 1. The incoming-call webhook answers with TwiML pointing at `/ws/call`
//! 2. The provider connects and sends `connected`, then `start` with the
//!    stream and call ids; the server opens a call session
//! 3. `media` events carry base64 mu-law caller audio, forwarded to
//!    transcription
//! 4. The server streams synthesized replies back as `media` events and sends
//!    `clear` when the caller barges in
//! 5. `stop` or a disconnect closes the session
//!
//! ### Message Types
//!
//! **Incoming:**
//! - `{"event": "connected", "protocol": "Call", "version": "1.0.0"}`
//! - `{"event": "start", "streamSid": "MZ...", "start": {"callSid": "CA...", ...}}`
//! - `{"event": "media", "streamSid": "MZ...", "media": {"payload": "<base64>"}}`
//! - `{"event": "stop", "streamSid": "MZ..."}`
//!
//! **Outgoing:**
//! - `{"event": "media", "streamSid": "MZ...", "media": {"payload": "<base64>"}}`
//! - `{"event": "clear", "streamSid": "MZ..."}`

pub mod handler;
pub mod messages;


// Re-export commonly used items
pub use handler::media_stream_handler;
pub use messages::{IncomingMessage, OutgoingMessage};
