use std::time::Duration;

use serde_json::json;

use super::helpers::{CALL_ID, Fixture, STREAM_ID, SYSTEM_PROMPT, drain, media_sequences};
use super::stubs::{StubGenerator, StubSynthesizer, tool_call};
use crate::core::booking::{BookingStatus, BookingStore};
use crate::core::conversation::Turn;
use crate::core::llm::{LLMError, ResponseEvent};
use crate::core::session::{OutboundFrame, SessionState};
use crate::core::stt::TranscriptEvent;

fn final_text(text: &str) -> TranscriptEvent {
    TranscriptEvent::Final(text.to_string())
}

fn clear_frame() -> OutboundFrame {
    OutboundFrame::Clear {
        stream_id: STREAM_ID.to_string(),
    }
}

#[tokio::test]
async fn test_utterance_becomes_user_turn_and_reply() {
    let fixture = Fixture::new(
        StubGenerator::replies(&["Hello! How can I help?"]),
        StubSynthesizer::new(160),
    );
    let (mut controller, mut frames) = fixture.controller();

    controller.handle_transcript(TranscriptEvent::Partial("I'd".to_string())).await;
    controller.handle_transcript(final_text("I'd like")).await;
    controller.handle_transcript(final_text("an appointment")).await;
    assert!(!controller.has_active_generation());

    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    assert_eq!(controller.state(), SessionState::Generating);
    controller.settle().await;

    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(
        controller.history(),
        vec![
            Turn::System {
                content: SYSTEM_PROMPT.to_string()
            },
            Turn::user("I'd like an appointment"),
            Turn::assistant("Hello! How can I help?"),
        ]
    );
    assert_eq!(media_sequences(&drain(&mut frames)), vec![0, 1]);
}

#[tokio::test]
async fn test_empty_speech_final_is_noop() {
    let fixture = Fixture::new(StubGenerator::replies(&["Hi."]), StubSynthesizer::new(160));
    let (mut controller, _frames) = fixture.controller();

    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    controller.handle_transcript(TranscriptEvent::Partial("hel".to_string())).await;
    controller.handle_transcript(TranscriptEvent::UtteranceEnd).await;
    controller.handle_transcript(TranscriptEvent::Metadata).await;

    assert!(!controller.has_active_generation());
    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(controller.history().len(), 1);
    assert!(fixture.generator.requests().is_empty());
}

#[tokio::test]
async fn test_utterance_end_closes_utterance() {
    let fixture = Fixture::new(StubGenerator::replies(&["Sure."]), StubSynthesizer::new(160));
    let (mut controller, _frames) = fixture.controller();

    controller.handle_transcript(final_text("Hello")).await;
    controller.handle_transcript(TranscriptEvent::UtteranceEnd).await;
    controller.settle().await;

    assert_eq!(controller.history().len(), 3);
}

#[tokio::test]
async fn test_barge_in_discards_remaining_segments() {
    let fixture = Fixture::new(
        StubGenerator::replies(&["One. Two. Three."]),
        StubSynthesizer::new(160).hold("Two."),
    );
    let (mut controller, mut frames) = fixture.controller();

    controller.handle_transcript(final_text("Count for me")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    assert_eq!(controller.state(), SessionState::Generating);

    let Some(OutboundFrame::Media(first)) = frames.recv().await else {
        panic!("expected first segment");
    };
    assert_eq!(first.sequence, 0);
    controller.process_queued_notices().await;
    assert_eq!(controller.state(), SessionState::Speaking);
    assert!(controller.has_active_generation());

    controller.handle_transcript(TranscriptEvent::SpeechStarted).await;
    assert!(!controller.has_active_generation());
    assert!(!controller.has_pending_hangup());
    assert_eq!(controller.state(), SessionState::Idle);

    fixture.synthesizer.release();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(drain(&mut frames), vec![clear_frame()]);
    assert!(!fixture.synthesizer.spoken().contains(&"Three.".to_string()));
    // No assistant turn for the interrupted reply
    assert_eq!(controller.history().len(), 2);

    controller.settle().await;
    assert_eq!(controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_new_utterance_cancels_previous_generation() {
    let fixture = Fixture::new(
        StubGenerator::replies(&["One. Two. Three.", "Sure."]),
        StubSynthesizer::new(160).hold("Two."),
    );
    let (mut controller, mut frames) = fixture.controller();

    controller.handle_transcript(final_text("first question")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    assert!(matches!(frames.recv().await, Some(OutboundFrame::Media(_))));

    controller.handle_transcript(final_text("actually never mind")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    controller.settle().await;
    fixture.synthesizer.release();
    tokio::task::yield_now().await;

    // Only the second reply reaches the transport, after the first one's segment
    assert_eq!(media_sequences(&drain(&mut frames)), vec![1]);
    assert_eq!(
        controller.history()[1..],
        [
            Turn::user("first question"),
            Turn::user("actually never mind"),
            Turn::assistant("Sure."),
        ]
    );
    assert_eq!(controller.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_booking_arms_hangup() {
    let fixture = Fixture::new(
        StubGenerator::new(vec![
            vec![
                ResponseEvent::TextDelta("Let me book that.".to_string()),
                tool_call(
                    "call_1",
                    "book_appointment",
                    json!({"name": "Jane Doe", "datetime": "2025-03-14 10:00", "reason": "Checkup"}),
                ),
            ],
            vec![ResponseEvent::TextDelta(
                "You're booked for 10 AM. Goodbye!".to_string(),
            )],
        ]),
        StubSynthesizer::new(4000),
    );
    let (mut controller, _frames) = fixture.controller();

    controller.handle_transcript(final_text("Book Jane Doe for ten on March 14th")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    controller.settle().await;

    let bookings = fixture.store.list().await.unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].status, BookingStatus::Confirmed);

    let history = controller.history();
    assert_eq!(history.len(), 5);
    assert!(matches!(&history[3], Turn::ToolResult { invocation_id, .. } if invocation_id == "call_1"));
    assert_eq!(history[4], Turn::assistant("You're booked for 10 AM. Goodbye!"));

    assert_eq!(controller.state(), SessionState::Terminating);
    assert!(controller.has_pending_hangup());
    let plan = controller.hangup_plan().unwrap();
    assert!(!plan.is_termination);
    assert_eq!(plan.audio_byte_count, 12000);
    assert_eq!(plan.wait_seconds, 6.5);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(fixture.call_control.terminated().is_empty());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fixture.call_control.terminated(), vec![CALL_ID.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_speech_started_disarms_hangup() {
    let fixture = Fixture::new(
        StubGenerator::new(vec![vec![
            ResponseEvent::TextDelta("Goodbye!".to_string()),
            tool_call("call_9", "terminate_call", json!({})),
        ]]),
        StubSynthesizer::new(4000),
    );
    let (mut controller, mut frames) = fixture.controller();

    controller.handle_transcript(final_text("That's all, bye")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    controller.settle().await;

    let plan = controller.hangup_plan().unwrap();
    assert!(plan.is_termination);
    assert_eq!(plan.wait_seconds, 1.5);
    assert_eq!(controller.state(), SessionState::Terminating);
    drain(&mut frames);

    controller.handle_transcript(TranscriptEvent::SpeechStarted).await;
    assert!(!controller.has_pending_hangup());
    assert!(!controller.has_active_generation());
    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(drain(&mut frames), vec![clear_frame()]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(fixture.call_control.terminated().is_empty());
}

#[tokio::test]
async fn test_replayed_utterances_are_independent_turns() {
    let fixture = Fixture::new(
        StubGenerator::replies(&["Hi there.", "Hi again."]),
        StubSynthesizer::new(160),
    );
    let (mut controller, _frames) = fixture.controller();

    for _ in 0..2 {
        controller.handle_transcript(final_text("Hello")).await;
        controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
        controller.settle().await;
        controller.handle_transcript(TranscriptEvent::SpeechStarted).await;
    }

    let history = controller.history();
    assert!(matches!(history[0], Turn::System { .. }));
    assert_eq!(
        history[1..],
        [
            Turn::user("Hello"),
            Turn::assistant("Hi there."),
            Turn::user("Hello"),
            Turn::assistant("Hi again."),
        ]
    );
}

#[tokio::test]
async fn test_generation_failure_keeps_session_alive() {
    let fixture = Fixture::new(
        StubGenerator::failing(LLMError::NetworkError("connection reset".to_string())),
        StubSynthesizer::new(160),
    );
    let (mut controller, _frames) = fixture.controller();

    controller.handle_transcript(final_text("Hello")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    controller.settle().await;

    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(controller.history().len(), 2);
}

#[tokio::test]
async fn test_lost_transport_closes_session() {
    let fixture = Fixture::new(StubGenerator::replies(&["Hello."]), StubSynthesizer::new(160));
    let (mut controller, frames) = fixture.controller();
    drop(frames);

    controller.handle_transcript(final_text("Hello")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;
    controller.settle().await;

    assert_eq!(controller.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_closed_session_ignores_events() {
    let fixture = Fixture::new(StubGenerator::replies(&["Hello."]), StubSynthesizer::new(160));
    let (mut controller, _frames) = fixture.controller();

    controller.close().await;
    controller.handle_transcript(final_text("Hello")).await;
    controller.handle_transcript(TranscriptEvent::SpeechFinal).await;

    assert_eq!(controller.state(), SessionState::Closed);
    assert!(!controller.has_active_generation());
    assert_eq!(controller.history().len(), 1);
}
