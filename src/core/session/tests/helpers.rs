//! Shared fixtures for session tests.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::stubs::{RecordingCallControl, StubGenerator, StubSynthesizer};
use crate::core::booking::{BookingToolExecutor, MemoryBookingStore};
use crate::core::session::{
    AudioSink, HangupPolicy, HangupScheduler, OutboundFrame, ResponsePipeline, TurnController,
};

pub const STREAM_ID: &str = "MZ00000000000000000000000000000001";
pub const CALL_ID: &str = "CA00000000000000000000000000000001";
pub const SYSTEM_PROMPT: &str = "You are a receptionist.";

pub fn slots() -> Vec<String> {
    ["09:00", "10:00", "14:00", "15:00"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Collaborators of one test session, kept for assertions
pub struct Fixture {
    pub generator: Arc<StubGenerator>,
    pub synthesizer: Arc<StubSynthesizer>,
    pub store: Arc<MemoryBookingStore>,
    pub call_control: Arc<RecordingCallControl>,
    pub pipeline: Arc<ResponsePipeline>,
}

impl Fixture {
    pub fn new(generator: StubGenerator, synthesizer: StubSynthesizer) -> Self {
        let generator = Arc::new(generator);
        let synthesizer = Arc::new(synthesizer);
        let store = Arc::new(MemoryBookingStore::new(slots()));
        let tools = Arc::new(BookingToolExecutor::new(store.clone()));
        let pipeline = Arc::new(ResponsePipeline::new(
            generator.clone(),
            synthesizer.clone(),
            tools,
        ));

        Self {
            generator,
            synthesizer,
            store,
            call_control: Arc::new(RecordingCallControl::default()),
            pipeline,
        }
    }

    pub fn controller(&self) -> (TurnController, mpsc::Receiver<OutboundFrame>) {
        let (sink, frames) = AudioSink::channel(STREAM_ID, 64);
        let hangup = HangupScheduler::new(self.call_control.clone(), HangupPolicy::default());
        let controller = TurnController::new(
            CALL_ID,
            SYSTEM_PROMPT,
            sink,
            self.pipeline.clone(),
            hangup,
        );
        (controller, frames)
    }
}

/// Every frame currently queued for the transport
pub fn drain(frames: &mut mpsc::Receiver<OutboundFrame>) -> Vec<OutboundFrame> {
    let mut out = Vec::new();
    while let Ok(frame) = frames.try_recv() {
        out.push(frame);
    }
    out
}

/// Sequence numbers of the queued media frames, dropping other frames
pub fn media_sequences(frames: &[OutboundFrame]) -> Vec<u64> {
    frames
        .iter()
        .filter_map(|frame| match frame {
            OutboundFrame::Media(segment) => Some(segment.sequence),
            OutboundFrame::Clear { .. } => None,
        })
        .collect()
}
