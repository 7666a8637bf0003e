//! Axum WebSocket handler for the call media stream
//!
//! One connection carries one phone call. The `start` event opens a session,
//! `media` events feed caller audio to transcription, and `stop` or a
//! disconnect closes the session.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::session::{AudioSink, OutboundFrame};
use crate::state::AppState;

use super::messages::{IncomingMessage, OutgoingMessage};

/// Outbound frames buffered ahead of the socket writer
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Media stream handler
/// Upgrades the HTTP connection to the call's bidirectional media stream
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream connection upgrade requested");
    ws.on_upgrade(move |socket| handle_media_socket(socket, state))
}

/// The call attached to this connection
struct ActiveStream {
    stream_id: String,
    audio: mpsc::Sender<Bytes>,
}

async fn handle_media_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Media stream connected");

    let (mut sender, mut receiver) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<OutboundFrame>(CHANNEL_BUFFER_SIZE);

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let message = OutgoingMessage::from(frame);
            let json_str = match serde_json::to_string(&message) {
                Ok(json_str) => json_str,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(json_str.into())).await {
                warn!("Failed to send media stream message: {}", e);
                break;
            }
        }
    });

    let mut active: Option<ActiveStream> = None;

    while let Some(msg_result) = receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Media stream error: {}", e);
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => {
                info!("Media stream closed by peer");
                break;
            }
            Message::Binary(data) => {
                debug!("Ignoring binary frame: {} bytes", data.len());
                continue;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let incoming: IncomingMessage = match serde_json::from_str(text.as_str()) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!("Invalid media stream message: {}", e);
                continue;
            }
        };

        match incoming {
            IncomingMessage::Connected { protocol } => {
                debug!("Media stream protocol: {:?}", protocol);
            }
            IncomingMessage::Start { stream_sid, start } => {
                let Some(stream_id) = stream_sid.or(start.stream_sid) else {
                    warn!("Start event without a stream id");
                    continue;
                };
                if let Some(current) = &active {
                    warn!(
                        "Ignoring start for {}: stream {} already active",
                        stream_id, current.stream_id
                    );
                    continue;
                }

                let sink = AudioSink::new(stream_id.clone(), frame_tx.clone());
                match app_state
                    .core_state
                    .open_session(&stream_id, &start.call_sid, sink)
                    .await
                {
                    Ok(handle) => {
                        let audio = handle.audio();
                        if let Some(previous) = app_state.sessions().insert(handle) {
                            warn!("Replacing existing session for stream {}", stream_id);
                            previous.close().await;
                        }
                        active = Some(ActiveStream { stream_id, audio });
                    }
                    Err(e) => {
                        error!("Failed to start session for stream {}: {}", stream_id, e);
                        break;
                    }
                }
            }
            IncomingMessage::Media { media, .. } => {
                let Some(stream) = &active else {
                    continue;
                };
                match media.decode() {
                    Ok(chunk) => {
                        if stream.audio.send(chunk).await.is_err() {
                            debug!("Transcription input closed for {}", stream.stream_id);
                        }
                    }
                    Err(e) => warn!("Invalid media payload: {}", e),
                }
            }
            IncomingMessage::Stop { .. } => {
                info!("Media stream stopped");
                break;
            }
            IncomingMessage::Other => {}
        }
    }

    if let Some(stream) = active {
        drop(stream.audio);
        app_state.sessions().close(&stream.stream_id).await;
    }

    drop(frame_tx);
    sender_task.abort();
    info!("Media stream connection terminated");
}
