//! Outbound side of the media stream as seen by a session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::errors::{TransportError, TurnError};

/// Synthesized audio for exactly one sentence
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub stream_id: String,
    /// Per-session emission order, starting at 0
    pub sequence: u64,
    pub audio: Bytes,
}

/// Frames handed to the transport writer
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Media(AudioSegment),
    /// Drop audio already buffered on the telephony side
    Clear { stream_id: String },
}

/// Emits audio segments for one session
///
/// Clones share the sequence counter, so every segment of a session gets a
/// distinct, increasing sequence number.
#[derive(Clone)]
pub struct AudioSink {
    stream_id: Arc<str>,
    tx: mpsc::Sender<OutboundFrame>,
    sequence: Arc<AtomicU64>,
}

impl AudioSink {
    pub fn new(stream_id: impl Into<String>, tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            stream_id: Arc::from(stream_id.into()),
            tx,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sink plus the receiving end the transport writer drains
    pub fn channel(
        stream_id: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(stream_id, tx), rx)
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Number of segments emitted so far
    pub fn emitted(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Emit one segment unless `cancel` has fired
    ///
    /// The cancellation flag is checked after channel capacity is reserved and
    /// immediately before the frame is handed over, so a cancelled turn never
    /// emits.
    pub async fn emit(&self, audio: Bytes, cancel: &CancellationToken) -> Result<u64, TurnError> {
        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            permit = self.tx.reserve() => permit.map_err(|_| TransportError::Closed)?,
        };

        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        permit.send(OutboundFrame::Media(AudioSegment {
            stream_id: self.stream_id.to_string(),
            sequence,
            audio,
        }));
        Ok(sequence)
    }

    pub async fn clear(&self) -> Result<(), TransportError> {
        self.tx
            .send(OutboundFrame::Clear {
                stream_id: self.stream_id.to_string(),
            })
            .await
            .map_err(|_| TransportError::Closed)
    }
}
