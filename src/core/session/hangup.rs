//! Delayed, cancellable call termination.
//!
//! After a reply that booked an appointment or asked to end the call, the
//! session hangs up once the reply has had time to play out. The wait is the
//! playback duration of the emitted audio plus a grace period.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::config::defaults::{AUDIO_SAMPLE_RATE, BOOKING_GRACE_SECONDS, TERMINATION_GRACE_SECONDS};
use crate::core::telephony::CallControl;

/// Timing parameters for hangup plans
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HangupPolicy {
    /// Playback rate of outbound audio (8-bit mu-law: one byte per sample)
    pub bytes_per_second: u32,
    /// Grace after an explicit request to end the call
    pub termination_grace: f64,
    /// Grace after a confirmed booking
    pub booking_grace: f64,
}

impl Default for HangupPolicy {
    fn default() -> Self {
        Self {
            bytes_per_second: AUDIO_SAMPLE_RATE,
            termination_grace: TERMINATION_GRACE_SECONDS,
            booking_grace: BOOKING_GRACE_SECONDS,
        }
    }
}

impl HangupPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bytes_per_second: config.audio_sample_rate,
            termination_grace: config.hangup_termination_grace_seconds,
            booking_grace: config.hangup_booking_grace_seconds,
        }
    }

    pub fn wait_seconds(&self, audio_byte_count: u64, is_termination: bool) -> f64 {
        let playback = if self.bytes_per_second == 0 {
            0.0
        } else {
            audio_byte_count as f64 / f64::from(self.bytes_per_second)
        };
        let grace = if is_termination {
            self.termination_grace
        } else {
            self.booking_grace
        };
        playback + grace
    }
}

/// An armed, not yet fired hangup
#[derive(Debug, Clone, PartialEq)]
pub struct HangupPlan {
    pub call_id: String,
    pub audio_byte_count: u64,
    pub is_termination: bool,
    pub wait_seconds: f64,
}

impl HangupPlan {
    pub fn new(
        call_id: impl Into<String>,
        audio_byte_count: u64,
        is_termination: bool,
        policy: &HangupPolicy,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            audio_byte_count,
            is_termination,
            wait_seconds: policy.wait_seconds(audio_byte_count, is_termination),
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.wait_seconds).unwrap_or(Duration::ZERO)
    }
}

struct PendingHangup {
    plan: HangupPlan,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Holds at most one pending hangup for a session
pub struct HangupScheduler {
    call_control: Arc<dyn CallControl>,
    policy: HangupPolicy,
    pending: Option<PendingHangup>,
}

impl HangupScheduler {
    pub fn new(call_control: Arc<dyn CallControl>, policy: HangupPolicy) -> Self {
        Self {
            call_control,
            policy,
            pending: None,
        }
    }

    /// Arm a new plan, cancelling any earlier one first
    pub fn arm(&mut self, call_id: &str, audio_byte_count: u64, is_termination: bool) -> HangupPlan {
        self.cancel();

        let plan = HangupPlan::new(call_id, audio_byte_count, is_termination, &self.policy);
        info!(
            "Hangup for call {} in {:.1}s ({} audio bytes, termination: {})",
            plan.call_id, plan.wait_seconds, plan.audio_byte_count, plan.is_termination
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(fire_after(
            self.call_control.clone(),
            plan.call_id.clone(),
            plan.wait(),
            cancel.clone(),
        ));

        self.pending = Some(PendingHangup {
            plan: plan.clone(),
            cancel,
            handle,
        });
        plan
    }

    /// Disarm the pending plan. Returns `true` if one had not fired yet.
    pub fn cancel(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        pending.cancel.cancel();
        let was_pending = !pending.handle.is_finished();
        if was_pending {
            debug!("Hangup for call {} cancelled", pending.plan.call_id);
        }
        was_pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }

    pub fn plan(&self) -> Option<&HangupPlan> {
        self.pending.as_ref().map(|pending| &pending.plan)
    }
}

impl Drop for HangupScheduler {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
    }
}

async fn fire_after(
    call_control: Arc<dyn CallControl>,
    call_id: String,
    wait: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(wait) => {}
    }

    info!("Terminating call {}", call_id);
    if let Err(e) = call_control.terminate(&call_id).await {
        error!("Failed to terminate call {}: {}", call_id, e);
    }
}
