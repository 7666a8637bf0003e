use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::helpers::{Fixture, STREAM_ID, SYSTEM_PROMPT, drain, media_sequences};
use super::stubs::{StubGenerator, StubSynthesizer, tool_call};
use crate::core::booking::BookingStatus;
use crate::core::booking::BookingStore;
use crate::core::conversation::{ConversationHistory, Turn};
use crate::core::llm::{LLMError, ResponseEvent};
use crate::core::session::{AudioSink, OutboundFrame, TurnContext, TurnError};

fn context(user: &str) -> (TurnContext, tokio::sync::mpsc::Receiver<OutboundFrame>) {
    let mut history = ConversationHistory::new(SYSTEM_PROMPT);
    history.push(Turn::user(user));
    let (sink, frames) = AudioSink::channel(STREAM_ID, 64);
    let ctx = TurnContext {
        history: Arc::new(Mutex::new(history)),
        sink,
        cancel: CancellationToken::new(),
        on_segment: None,
    };
    (ctx, frames)
}

#[tokio::test]
async fn test_sentences_spoken_as_they_complete() {
    let fixture = Fixture::new(
        StubGenerator::new(vec![vec![
            ResponseEvent::TextDelta("Hello the".to_string()),
            ResponseEvent::TextDelta("re. How can".to_string()),
            ResponseEvent::TextDelta(" I help?".to_string()),
        ]]),
        StubSynthesizer::new(800),
    );
    let (ctx, mut frames) = context("Hi");

    let outcome = fixture.pipeline.run_turn(&ctx).await.unwrap();

    assert_eq!(
        fixture.synthesizer.spoken(),
        vec!["Hello there.", "How can I help?"]
    );
    assert_eq!(outcome.segments, 2);
    assert_eq!(outcome.audio_bytes, 1600);
    assert!(!outcome.requires_hangup());
    assert_eq!(media_sequences(&drain(&mut frames)), vec![0, 1]);
    assert_eq!(
        ctx.history.lock().last(),
        Some(&Turn::assistant("Hello there. How can I help?"))
    );
}

#[tokio::test]
async fn test_whitespace_reply_is_not_synthesized() {
    let fixture = Fixture::new(
        StubGenerator::replies(&["  \n \n  "]),
        StubSynthesizer::new(800),
    );
    let (ctx, mut frames) = context("Hi");

    let outcome = fixture.pipeline.run_turn(&ctx).await.unwrap();

    assert!(fixture.synthesizer.spoken().is_empty());
    assert_eq!(outcome.segments, 0);
    assert!(drain(&mut frames).is_empty());
}

#[tokio::test]
async fn test_synthesis_failure_skips_sentence() {
    let fixture = Fixture::new(
        StubGenerator::replies(&["First one. Bad one. Last one."]),
        StubSynthesizer::new(100).failing_on("Bad one."),
    );
    let (ctx, mut frames) = context("Hi");

    let outcome = fixture.pipeline.run_turn(&ctx).await.unwrap();

    assert_eq!(fixture.synthesizer.spoken().len(), 3);
    assert_eq!(outcome.segments, 2);
    assert_eq!(media_sequences(&drain(&mut frames)), vec![0, 1]);
    assert_eq!(
        ctx.history.lock().last().map(Turn::content),
        Some("First one. Bad one. Last one.")
    );
}

#[tokio::test]
async fn test_generation_failure_appends_nothing() {
    let fixture = Fixture::new(
        StubGenerator::failing(LLMError::ApiError {
            status: 429,
            body: "rate limited".to_string(),
        }),
        StubSynthesizer::new(100),
    );
    let (ctx, _frames) = context("Hi");

    let result = fixture.pipeline.run_turn(&ctx).await;

    assert!(matches!(result, Err(TurnError::Generation(_))));
    assert_eq!(ctx.history.lock().len(), 2);
}

#[tokio::test]
async fn test_cancelled_turn_emits_nothing() {
    let fixture = Fixture::new(
        StubGenerator::replies(&["Hello there."]),
        StubSynthesizer::new(100),
    );
    let (ctx, mut frames) = context("Hi");
    ctx.cancel.cancel();

    let result = fixture.pipeline.run_turn(&ctx).await;

    assert!(matches!(result, Err(TurnError::Cancelled)));
    assert!(drain(&mut frames).is_empty());
    assert!(fixture.generator.requests().is_empty());
    assert_eq!(ctx.history.lock().len(), 2);
}

#[tokio::test]
async fn test_tool_pass_then_text_only_pass() {
    let fixture = Fixture::new(
        StubGenerator::new(vec![
            vec![
                ResponseEvent::TextDelta("Let me check.".to_string()),
                tool_call("call_1", "check_availability", json!({"date": "2025-03-14"})),
            ],
            vec![ResponseEvent::TextDelta(
                "We have nine or ten in the morning.".to_string(),
            )],
        ]),
        StubSynthesizer::new(100),
    );
    let (ctx, mut frames) = context("Anything on March 14th?");

    let outcome = fixture.pipeline.run_turn(&ctx).await.unwrap();
    assert!(!outcome.requires_hangup());
    assert_eq!(media_sequences(&drain(&mut frames)), vec![0, 1]);

    let requests = fixture.generator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].with_tools);
    assert!(!requests[1].with_tools);

    let history = ctx.history.lock().turns().to_vec();
    assert_eq!(history.len(), 5);
    let Turn::Assistant { content, tool_calls } = &history[2] else {
        panic!("expected assistant tool-call turn, got {:?}", history[2]);
    };
    assert_eq!(content, "Let me check.");
    assert_eq!(tool_calls[0].name, "check_availability");
    assert_eq!(
        history[3],
        Turn::ToolResult {
            invocation_id: "call_1".to_string(),
            content: r#"["09:00","10:00","14:00","15:00"]"#.to_string(),
        }
    );
    assert_eq!(history[4], Turn::assistant("We have nine or ten in the morning."));

    // The second pass sees the resolved tool result
    assert_eq!(requests[1].history.len(), 4);
}

#[tokio::test]
async fn test_booking_recorded_in_outcome() {
    let fixture = Fixture::new(
        StubGenerator::new(vec![
            vec![tool_call(
                "call_7",
                "book_appointment",
                json!({"name": "Jane Doe", "datetime": "2025-03-14 10:00", "reason": "Checkup"}),
            )],
            vec![ResponseEvent::TextDelta("You're all set.".to_string())],
        ]),
        StubSynthesizer::new(4000),
    );
    let (ctx, _frames) = context("Book me for ten.");

    let outcome = fixture.pipeline.run_turn(&ctx).await.unwrap();

    assert!(outcome.requires_hangup());
    assert!(!outcome.is_termination());
    assert_eq!(outcome.booked.len(), 1);
    assert_eq!(outcome.booked[0].status, BookingStatus::Confirmed);
    assert_eq!(outcome.audio_bytes, 4000);
    assert_eq!(fixture.store.list().await.unwrap().len(), 1);
}
