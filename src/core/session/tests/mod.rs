//! Tests for call sessions
//!
//! - `pipeline`: sentence streaming, synthesis failures and tool passes
//! - `turns`: controller state machine, barge-in and hangup arming
//! - `registry`: session lifecycle through the registry
//!
//! Stub adapters live in `stubs`, shared fixtures in `helpers`.

pub(crate) mod helpers;

mod pipeline;
mod turns;
