//! Incoming-call webhook
//!
//! Answers the telephony provider with TwiML that greets the caller and
//! connects the call to the media stream endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Path of the media stream WebSocket
pub const MEDIA_STREAM_PATH: &str = "/ws/call";

pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let host = match &state.config.public_host {
        Some(host) => host.clone(),
        None => headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Missing Host header".to_string()))?,
    };

    info!("Incoming call, streaming to {}", host);
    let body = render_twiml(&state.config.greeting, &host);
    Ok(([(header::CONTENT_TYPE, "application/xml")], body).into_response())
}

pub fn render_twiml(greeting: &str, host: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response>\
         <Say>{}</Say>\
         <Connect><Stream url=\"wss://{}{}\" /></Connect>\
         </Response>",
        escape_xml(greeting),
        escape_xml(host),
        MEDIA_STREAM_PATH
    )
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
