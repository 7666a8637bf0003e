//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `bookings` - Stored bookings listing
//! - `twiml` - Incoming-call webhook answering with TwiML
//! - `ws` - Call media stream WebSocket

pub mod api;
pub mod bookings;
pub mod twiml;
pub mod ws;

// Re-export commonly used handlers for convenient access
pub use ws::media_stream_handler;
