//! Media stream message types
//!
//! JSON text frames exchanged with the telephony provider's media stream.
//! Audio travels as base64-encoded 8 kHz mu-law in both directions.

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::session::OutboundFrame;

/// Messages received from the media stream
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum IncomingMessage {
    Connected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
    },
    Start {
        #[serde(rename = "streamSid", default, skip_serializing_if = "Option::is_none")]
        stream_sid: Option<String>,
        start: StartInfo,
    },
    Media {
        #[serde(rename = "streamSid", default, skip_serializing_if = "Option::is_none")]
        stream_sid: Option<String>,
        media: MediaPayload,
    },
    Stop {
        #[serde(rename = "streamSid", default, skip_serializing_if = "Option::is_none")]
        stream_sid: Option<String>,
    },
    /// Marks, DTMF and anything newer than this handler
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_sid: Option<String>,
    pub call_sid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct MediaPayload {
    /// Base64 audio
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
}

impl MediaPayload {
    pub fn decode(&self) -> Result<Bytes, base64::DecodeError> {
        general_purpose::STANDARD
            .decode(self.payload.as_bytes())
            .map(Bytes::from)
    }
}

/// Messages sent back on the media stream
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutgoingMedia,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct OutgoingMedia {
    pub payload: String,
}

impl From<OutboundFrame> for OutgoingMessage {
    fn from(frame: OutboundFrame) -> Self {
        match frame {
            OutboundFrame::Media(segment) => OutgoingMessage::Media {
                stream_sid: segment.stream_id,
                media: OutgoingMedia {
                    payload: general_purpose::STANDARD.encode(&segment.audio),
                },
            },
            OutboundFrame::Clear { stream_id } => OutgoingMessage::Clear {
                stream_sid: stream_id,
            },
        }
    }
}
