//! Live sessions keyed by media stream id.

use std::collections::HashMap;

use bytes::Bytes;
use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::controller::TurnController;
use crate::core::stt::TranscriptEvent;

/// Control messages for a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Close,
}

/// Handle to one running call session
pub struct SessionHandle {
    stream_id: String,
    call_id: String,
    audio: mpsc::Sender<Bytes>,
    commands: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Run `controller` on its own task
    ///
    /// `audio` feeds inbound caller audio to the transcription stream whose
    /// events arrive on `transcripts`.
    pub fn spawn(
        stream_id: impl Into<String>,
        controller: TurnController,
        audio: mpsc::Sender<Bytes>,
        transcripts: mpsc::Receiver<TranscriptEvent>,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel(4);
        let call_id = controller.call_id().to_string();
        let task = tokio::spawn(controller.run(transcripts, command_rx));

        Self {
            stream_id: stream_id.into(),
            call_id,
            audio,
            commands,
            task,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Sender for inbound caller audio
    pub fn audio(&self) -> mpsc::Sender<Bytes> {
        self.audio.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the session and wait for its task to wind down
    pub async fn close(self) {
        let _ = self.commands.send(SessionCommand::Close).await;
        drop(self.audio);
        if let Err(e) = self.task.await {
            warn!("Session task for stream {} failed: {}", self.stream_id, e);
        }
    }
}

/// Registry of live sessions, owned by the server for its whole lifetime
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, returning any session it replaced
    pub fn insert(&self, handle: SessionHandle) -> Option<SessionHandle> {
        self.sessions
            .write()
            .insert(handle.stream_id.clone(), handle)
    }

    pub fn remove(&self, stream_id: &str) -> Option<SessionHandle> {
        self.sessions.write().remove(stream_id)
    }

    pub fn contains(&self, stream_id: &str) -> bool {
        self.sessions.read().contains_key(stream_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Remove and close one session
    pub async fn close(&self, stream_id: &str) -> bool {
        let Some(handle) = self.remove(stream_id) else {
            return false;
        };
        handle.close().await;
        true
    }

    /// Close every live session
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = self
            .sessions
            .write()
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        if handles.is_empty() {
            return;
        }

        info!("Closing {} live session(s)", handles.len());
        join_all(handles.into_iter().map(SessionHandle::close)).await;
    }
}
