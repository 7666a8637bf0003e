//! Per-call turn controller.
//!
//! The controller is the only place that starts, cancels and sequences work
//! for a call. It consumes transcript events, turns completed utterances into
//! user turns, runs at most one generation task at a time and owns the
//! session's hangup plan.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::TurnError;
use super::hangup::{HangupPlan, HangupScheduler};
use super::pipeline::{ResponsePipeline, TurnContext, TurnOutcome};
use super::registry::SessionCommand;
use super::transport::AudioSink;
use super::utterance::UtteranceBuffer;
use crate::core::conversation::{ConversationHistory, Turn};
use crate::core::stt::TranscriptEvent;

/// Lifecycle state of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Listening, nothing in flight
    Idle,
    /// A reply is being generated, no audio emitted yet
    Generating,
    /// A reply is being generated and audio has been emitted
    Speaking,
    /// A hangup is armed
    Terminating,
    Closed,
}

enum ControllerNotice {
    Speaking {
        generation: u64,
    },
    Finished {
        generation: u64,
        result: Result<TurnOutcome, TurnError>,
    },
}

struct ActiveGeneration {
    id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct TurnController {
    call_id: String,
    sink: AudioSink,
    pipeline: Arc<ResponsePipeline>,
    history: Arc<Mutex<ConversationHistory>>,
    utterance: UtteranceBuffer,
    state: SessionState,
    active: Option<ActiveGeneration>,
    hangup: HangupScheduler,
    next_generation: u64,
    /// Audio was emitted since the last clear sent to the transport
    audio_since_clear: bool,
    notice_tx: mpsc::UnboundedSender<ControllerNotice>,
    notice_rx: mpsc::UnboundedReceiver<ControllerNotice>,
}

impl TurnController {
    pub fn new(
        call_id: impl Into<String>,
        system_prompt: impl Into<String>,
        sink: AudioSink,
        pipeline: Arc<ResponsePipeline>,
        hangup: HangupScheduler,
    ) -> Self {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        Self {
            call_id: call_id.into(),
            sink,
            pipeline,
            history: Arc::new(Mutex::new(ConversationHistory::new(system_prompt))),
            utterance: UtteranceBuffer::new(),
            state: SessionState::Idle,
            active: None,
            hangup,
            next_generation: 0,
            audio_since_clear: false,
            notice_tx,
            notice_rx,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn has_active_generation(&self) -> bool {
        self.active.is_some()
    }

    pub fn has_pending_hangup(&self) -> bool {
        self.hangup.is_pending()
    }

    pub fn hangup_plan(&self) -> Option<HangupPlan> {
        self.hangup.plan().cloned()
    }

    /// Copy of the conversation so far
    pub fn history(&self) -> Vec<Turn> {
        self.history.lock().turns().to_vec()
    }

    /// Drive the session until it is closed
    ///
    /// The session survives the transcription stream ending; only a close
    /// command, the command channel dropping or a dead transport end it.
    pub async fn run(
        mut self,
        mut transcripts: mpsc::Receiver<TranscriptEvent>,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) {
        let mut transcribing = true;

        while self.state != SessionState::Closed {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(SessionCommand::Close) | None => break,
                },
                Some(notice) = self.notice_rx.recv() => self.handle_notice(notice).await,
                event = transcripts.recv(), if transcribing => match event {
                    Some(event) => self.handle_transcript(event).await,
                    None => {
                        warn!("Transcription stream ended for call {}", self.call_id);
                        transcribing = false;
                    }
                },
            }
        }

        self.close().await;
        info!("Session for call {} closed", self.call_id);
    }

    pub async fn handle_transcript(&mut self, event: TranscriptEvent) {
        if self.state == SessionState::Closed {
            return;
        }

        match event {
            TranscriptEvent::Final(text) => self.utterance.push_final(&text),
            TranscriptEvent::SpeechFinal | TranscriptEvent::UtteranceEnd => {
                self.finish_utterance().await
            }
            TranscriptEvent::SpeechStarted => self.barge_in().await,
            TranscriptEvent::Partial(_) | TranscriptEvent::Metadata => {}
        }
    }

    async fn finish_utterance(&mut self) {
        let Some(text) = self.utterance.take() else {
            return;
        };

        info!("Caller on {}: {}", self.call_id, text);
        self.history.lock().push(Turn::user(text));
        self.start_generation().await;
    }

    async fn start_generation(&mut self) {
        self.stop_generation().await;
        self.hangup.cancel();

        self.next_generation += 1;
        let id = self.next_generation;
        let cancel = CancellationToken::new();

        let speaking = self.notice_tx.clone();
        let ctx = TurnContext {
            history: self.history.clone(),
            sink: self.sink.clone(),
            cancel: cancel.clone(),
            on_segment: Some(Arc::new(move |_sequence| {
                let _ = speaking.send(ControllerNotice::Speaking { generation: id });
            })),
        };

        let pipeline = self.pipeline.clone();
        let notices = self.notice_tx.clone();
        let handle = tokio::spawn(async move {
            let result = pipeline.run_turn(&ctx).await;
            let _ = notices.send(ControllerNotice::Finished {
                generation: id,
                result,
            });
        });

        debug!("Generation {} started for call {}", id, self.call_id);
        self.active = Some(ActiveGeneration { id, cancel, handle });
        self.state = SessionState::Generating;
    }

    /// Cancel the active generation and wait for it to stop.
    /// Returns `true` if one was running.
    async fn stop_generation(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };

        active.cancel.cancel();
        if let Err(e) = active.handle.await
            && !e.is_cancelled()
        {
            warn!("Generation task for call {} failed: {}", self.call_id, e);
        }
        debug!("Generation {} cancelled for call {}", active.id, self.call_id);
        true
    }

    async fn barge_in(&mut self) {
        let interrupted = self.stop_generation().await;
        let disarmed = self.hangup.cancel();

        if interrupted || self.audio_since_clear {
            if let Err(e) = self.sink.clear().await {
                debug!("Could not clear playback for call {}: {}", self.call_id, e);
            }
            self.audio_since_clear = false;
        }

        if interrupted || disarmed {
            info!("Barge-in on call {}: reply interrupted", self.call_id);
        }
        self.state = SessionState::Idle;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == generation)
    }

    async fn handle_notice(&mut self, notice: ControllerNotice) {
        match notice {
            ControllerNotice::Speaking { generation } => {
                if !self.is_current(generation) {
                    return;
                }
                self.audio_since_clear = true;
                if self.state == SessionState::Generating {
                    self.state = SessionState::Speaking;
                }
            }
            ControllerNotice::Finished { generation, result } => {
                if !self.is_current(generation) {
                    debug!("Ignoring result of stale generation {}", generation);
                    return;
                }
                self.active = None;

                match result {
                    Ok(outcome) if outcome.requires_hangup() => {
                        self.hangup.arm(
                            &self.call_id,
                            outcome.audio_bytes,
                            outcome.is_termination(),
                        );
                        self.state = SessionState::Terminating;
                    }
                    Ok(_) => self.state = SessionState::Idle,
                    Err(TurnError::Cancelled) => {
                        debug!("Generation {} cancelled", generation);
                        self.state = SessionState::Idle;
                    }
                    Err(TurnError::Transport(e)) => {
                        warn!("Transport lost for call {}: {}", self.call_id, e);
                        self.close().await;
                    }
                    Err(e) => {
                        warn!("Turn failed for call {}: {}", self.call_id, e);
                        self.state = SessionState::Idle;
                    }
                }
            }
        }
    }

    /// Cancel everything in flight and stop accepting events
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.stop_generation().await;
        self.hangup.cancel();
        self.utterance.clear();
        self.state = SessionState::Closed;
    }

    /// Process the notices already queued, without waiting
    #[cfg(test)]
    pub(crate) async fn process_queued_notices(&mut self) {
        while let Ok(notice) = self.notice_rx.try_recv() {
            self.handle_notice(notice).await;
        }
    }

    /// Process notices until no generation is in flight
    #[cfg(test)]
    pub(crate) async fn settle(&mut self) {
        while self.active.is_some() {
            match self.notice_rx.recv().await {
                Some(notice) => self.handle_notice(notice).await,
                None => break,
            }
        }
    }
}
