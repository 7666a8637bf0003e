//! Response generation for one caller turn.
//!
//! A turn streams the model's reply, cuts it into sentences as it arrives and
//! synthesizes each sentence straight away, so the caller hears the first
//! sentence while the rest is still being generated. Tool calls requested by
//! the model are resolved once and followed by a single text-only pass.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::TurnError;
use super::transport::AudioSink;
use crate::core::booking::{Booking, BookingToolExecutor, ToolEffect};
use crate::core::conversation::{ConversationHistory, ToolInvocation, Turn};
use crate::core::llm::{ResponseEvent, ResponseGenerator, ToolDefinition};
use crate::core::segmenter::SentenceSegmenter;
use crate::core::tts::SpeechSynthesizer;

/// Called with the sequence number of every emitted segment
pub type SegmentObserver = Arc<dyn Fn(u64) + Send + Sync>;

/// Everything a turn needs from its session
#[derive(Clone)]
pub struct TurnContext {
    pub history: Arc<Mutex<ConversationHistory>>,
    pub sink: AudioSink,
    pub cancel: CancellationToken,
    pub on_segment: Option<SegmentObserver>,
}

/// What a completed turn did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Total bytes of audio emitted, across both passes
    pub audio_bytes: u64,
    pub segments: usize,
    pub booked: Vec<Booking>,
    pub terminate_requested: bool,
}

impl TurnOutcome {
    pub fn requires_hangup(&self) -> bool {
        self.terminate_requested || !self.booked.is_empty()
    }

    pub fn is_termination(&self) -> bool {
        self.terminate_requested
    }
}

#[derive(Default)]
struct PassOutput {
    text: String,
    tool_calls: Vec<ToolInvocation>,
}

/// Shared, stateless driver of caller turns
pub struct ResponsePipeline {
    generator: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    tools: Arc<BookingToolExecutor>,
    tool_definitions: Vec<ToolDefinition>,
}

impl ResponsePipeline {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        tools: Arc<BookingToolExecutor>,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            tools,
            tool_definitions: BookingToolExecutor::definitions(),
        }
    }

    /// Generate, speak and record the reply to the latest user turn
    ///
    /// On success the reply is appended to the history as one assistant turn.
    /// A cancelled turn stops at its next suspension point and appends nothing
    /// further.
    pub async fn run_turn(&self, ctx: &TurnContext) -> Result<TurnOutcome, TurnError> {
        let mut outcome = TurnOutcome::default();

        let tools = (!self.tool_definitions.is_empty()).then_some(self.tool_definitions.as_slice());
        let first = self.stream_pass(ctx, tools, &mut outcome).await?;

        let reply = if first.tool_calls.is_empty() {
            first.text
        } else {
            let results = self.resolve_tools(&first.tool_calls, &mut outcome).await;
            {
                let mut history = ctx.history.lock();
                history.push(Turn::Assistant {
                    content: first.text,
                    tool_calls: first.tool_calls,
                });
                history.extend(results);
            }

            if ctx.cancel.is_cancelled() {
                return Err(TurnError::Cancelled);
            }
            self.stream_pass(ctx, None, &mut outcome).await?.text
        };

        ctx.history.lock().push(Turn::assistant(reply));
        debug!(
            "Turn on stream {} finished: {} segments, {} bytes",
            ctx.sink.stream_id(),
            outcome.segments,
            outcome.audio_bytes
        );
        Ok(outcome)
    }

    async fn stream_pass(
        &self,
        ctx: &TurnContext,
        tools: Option<&[ToolDefinition]>,
        outcome: &mut TurnOutcome,
    ) -> Result<PassOutput, TurnError> {
        let snapshot = ctx.history.lock().turns().to_vec();

        let mut stream = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(TurnError::Cancelled),
            stream = self.generator.generate(&snapshot, tools) => stream?,
        };

        let mut segmenter = SentenceSegmenter::new();
        let mut output = PassOutput::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(TurnError::Cancelled),
                event = stream.next() => event,
            };

            match event {
                None => break,
                Some(Ok(ResponseEvent::TextDelta(delta))) => {
                    output.text.push_str(&delta);
                    for sentence in segmenter.push(&delta) {
                        self.speak(ctx, &sentence, outcome).await?;
                    }
                }
                Some(Ok(ResponseEvent::ToolCalls(calls))) => output.tool_calls.extend(calls),
                Some(Err(e)) => return Err(e.into()),
            }
        }

        if let Some(rest) = segmenter.finish() {
            self.speak(ctx, &rest, outcome).await?;
        }
        Ok(output)
    }

    /// Synthesize and emit one sentence
    ///
    /// A synthesis failure skips the sentence; the turn goes on.
    async fn speak(
        &self,
        ctx: &TurnContext,
        sentence: &str,
        outcome: &mut TurnOutcome,
    ) -> Result<(), TurnError> {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return Ok(());
        }

        let synthesized = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(TurnError::Cancelled),
            result = self.synthesizer.synthesize(sentence) => result,
        };

        let audio = match synthesized {
            Ok(audio) if audio.is_empty() => return Ok(()),
            Ok(audio) => audio,
            Err(e) => {
                warn!("Skipping sentence, synthesis failed: {}", e);
                return Ok(());
            }
        };

        let len = audio.len() as u64;
        let sequence = ctx.sink.emit(audio, &ctx.cancel).await?;
        outcome.audio_bytes += len;
        outcome.segments += 1;
        if let Some(observer) = &ctx.on_segment {
            observer(sequence);
        }
        Ok(())
    }

    async fn resolve_tools(
        &self,
        calls: &[ToolInvocation],
        outcome: &mut TurnOutcome,
    ) -> Vec<Turn> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            info!("Resolving tool call {} ({})", call.name, call.id);
            let resolved = self.tools.execute(call).await;
            match resolved.effect {
                Some(ToolEffect::Booked(booking)) => outcome.booked.push(booking),
                Some(ToolEffect::TerminateRequested) => outcome.terminate_requested = true,
                None => {}
            }
            results.push(Turn::ToolResult {
                invocation_id: call.id.clone(),
                content: resolved.content,
            });
        }
        results
    }
}
