//! # Call sessions
//!
//! One session per phone call. A session owns the conversation history, at
//! most one in-flight generation task and at most one pending hangup. The
//! [`TurnController`] drives the session from transcript events; the
//! [`ResponsePipeline`] turns each caller utterance into spoken audio; the
//! [`SessionRegistry`] tracks live sessions for the server.
//!
//! Every suspension point of a generation task races a per-task
//! [`CancellationToken`](tokio_util::sync::CancellationToken), so barge-in
//! stops synthesis and emission immediately.

pub mod controller;
pub mod errors;
pub mod hangup;
pub mod pipeline;
pub mod registry;
pub mod transport;
pub mod utterance;

#[cfg(test)]
mod tests;

pub use controller::{SessionState, TurnController};
pub use errors::{SessionError, TransportError, TurnError};
pub use hangup::{HangupPlan, HangupPolicy, HangupScheduler};
pub use pipeline::{ResponsePipeline, SegmentObserver, TurnContext, TurnOutcome};
pub use registry::{SessionCommand, SessionHandle, SessionRegistry};
pub use transport::{AudioSegment, AudioSink, OutboundFrame};
pub use utterance::UtteranceBuffer;
