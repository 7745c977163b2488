use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::routine::{ExhaleRoute, StepKind};
use crate::session::SessionStatus;

/// Every session state change produces an Event.
/// Front-ends consume them alongside rendered frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        routine_id: String,
        /// True when continuing a paused session.
        resumed: bool,
        at: DateTime<Utc>,
    },
    /// Start was refused; the session is unchanged.
    StartRejected {
        reason: SessionError,
        at: DateTime<Utc>,
    },
    SessionPaused {
        cycle_index: usize,
        step_index: usize,
        elapsed_in_step: f64,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    /// A step of a different kind than the previous one is now shown.
    PhaseChanged {
        phase: StepKind,
        exhale_route: Option<ExhaleRoute>,
        cycle_index: usize,
        step_index: usize,
        /// 1-based pass of the cycle.
        repetition: u32,
        repetitions: u32,
        at: DateTime<Utc>,
    },
    /// An exhale -> inhale rest began.
    TransitionStarted {
        cycle_index: usize,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        routine_id: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: SessionStatus,
        routine_id: Option<String>,
        cycle_index: usize,
        step_index: usize,
        elapsed_in_step: f64,
        repetitions_left: u32,
        in_transition: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Stable name of the variant, as serialized in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "SessionStarted",
            Event::StartRejected { .. } => "StartRejected",
            Event::SessionPaused { .. } => "SessionPaused",
            Event::SessionReset { .. } => "SessionReset",
            Event::PhaseChanged { .. } => "PhaseChanged",
            Event::TransitionStarted { .. } => "TransitionStarted",
            Event::SessionCompleted { .. } => "SessionCompleted",
            Event::StateSnapshot { .. } => "StateSnapshot",
        }
    }
}
