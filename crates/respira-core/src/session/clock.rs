//! Session clock: the breathing-session state machine.
//!
//! The clock is delta-driven and owns no thread or timer. Whoever drives it
//! measures the time between two frames and calls [`SessionClock::advance`]
//! once per frame.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed          (reset returns to Idle from anywhere)
//! ```
//!
//! ## Per-frame advance
//!
//! 1. During an exhale -> inhale rest, time accumulates into the rest window
//!    and nothing else moves until [`TRANSITION_DELAY_SECS`] has passed.
//! 2. Otherwise time accumulates into the current step. Below the step
//!    duration the step is reported at `elapsed / duration`.
//! 3. At the boundary the step index advances, wrapping into the next
//!    repetition or the next cycle; past the last cycle the session completes.
//!    At most one boundary is crossed per frame and surplus time is dropped.
//! 4. A boundary from exhale into inhale opens a rest window instead of
//!    reporting the new step.
//! 5. Every reported step whose kind differs from the last reported kind
//!    carries a phase change.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::routine::{CycleDefinition, ExhaleRoute, RoutineDefinition, StepDefinition, StepKind};

/// Rest inserted between the end of an exhale and the next inhale.
pub const TRANSITION_DELAY_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

/// The playable view of one routine: empty cycles removed, repetitions
/// floored at 1. Derived when a routine is selected, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub routine_id: String,
    pub cycles: Vec<CycleDefinition>,
}

impl SessionPlan {
    pub fn from_routine(routine: &RoutineDefinition) -> Self {
        Self {
            routine_id: routine.id.clone(),
            cycles: routine
                .playable_cycles()
                .map(|c| CycleDefinition::new(c.effective_repetitions(), c.steps.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Sum of all step durations across all repetitions, without rests.
    pub fn total_duration_secs(&self) -> f64 {
        self.cycles
            .iter()
            .map(|c| c.pass_seconds() * c.effective_repetitions() as f64)
            .sum()
    }

    /// Number of exhale -> inhale rests a full playthrough contains.
    pub fn transition_count(&self) -> usize {
        let sequence: Vec<StepKind> = self
            .cycles
            .iter()
            .flat_map(|c| {
                std::iter::repeat(&c.steps)
                    .take(c.effective_repetitions() as usize)
                    .flatten()
                    .map(|s| s.kind)
            })
            .collect();
        sequence
            .windows(2)
            .filter(|w| w[0] == StepKind::Exhale && w[1] == StepKind::Inhale)
            .count()
    }

    fn step(&self, cycle_index: usize, step_index: usize) -> Option<&StepDefinition> {
        self.cycles.get(cycle_index)?.steps.get(step_index)
    }
}

/// Mutable position of an active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub running: bool,
    pub cycle_index: usize,
    pub step_index: usize,
    /// Seconds spent in the current step.
    pub elapsed_in_step: f64,
    /// Passes of the current cycle still to play, including this one.
    pub repetitions_left: u32,
    pub in_transition: bool,
    pub transition_elapsed: f64,
    /// Kind of the last step reported to the renderer.
    pub current_phase: Option<StepKind>,
    pub completed: bool,
}

impl SessionState {
    fn fresh(plan: &SessionPlan) -> Self {
        Self {
            running: true,
            cycle_index: 0,
            step_index: 0,
            elapsed_in_step: 0.0,
            repetitions_left: plan
                .cycles
                .first()
                .map(CycleDefinition::effective_repetitions)
                .unwrap_or(1),
            in_transition: false,
            transition_elapsed: 0.0,
            current_phase: None,
            completed: false,
        }
    }
}

/// Where the session stands within its plan, ready for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepPosition {
    pub kind: StepKind,
    pub exhale_route: Option<ExhaleRoute>,
    pub duration_seconds: f64,
    /// Fraction of the step elapsed, in `[0, 1)`.
    pub progress: f64,
    pub cycle_index: usize,
    pub cycle_count: usize,
    pub step_index: usize,
    /// 1-based pass of the current cycle.
    pub repetition: u32,
    pub repetitions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum ClockFrame {
    Step(StepPosition),
    Resting {
        cycle_index: usize,
        remaining_secs: f64,
    },
    Completed,
}

/// Result of one frame of advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub frame: ClockFrame,
    /// Set when the reported step starts a new phase kind.
    pub phase_changed: Option<StepKind>,
    /// Set on the frame that opens an exhale -> inhale rest.
    pub transition_started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartKind {
    Fresh,
    Resumed,
}

/// Breathing-session state machine.
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    plan: Option<SessionPlan>,
    state: Option<SessionState>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock with a plan loaded, in `Idle`.
    pub fn with_plan(plan: SessionPlan) -> Self {
        Self {
            plan: Some(plan),
            state: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn plan(&self) -> Option<&SessionPlan> {
        self.plan.as_ref()
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        match &self.state {
            None => SessionStatus::Idle,
            Some(s) if s.completed => SessionStatus::Completed,
            Some(s) if s.running => SessionStatus::Running,
            Some(_) => SessionStatus::Paused,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    /// The current frame without advancing time.
    pub fn position(&self) -> Option<ClockFrame> {
        let plan = self.plan.as_ref()?;
        let state = self.state.as_ref()?;
        if state.completed {
            return Some(ClockFrame::Completed);
        }
        if state.in_transition {
            return Some(resting(state));
        }
        position_of(plan, state).map(ClockFrame::Step)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the plan. Any session in progress is discarded.
    pub fn load(&mut self, plan: SessionPlan) {
        self.plan = Some(plan);
        self.state = None;
    }

    /// Start or resume.
    ///
    /// Returns `Ok(None)` when already running. A paused session resumes at
    /// exactly the position it was paused at.
    ///
    /// # Errors
    /// Rejects when no plan is loaded, the plan has no playable cycle, or the
    /// session already completed. A rejected start leaves the clock unchanged.
    pub fn start(&mut self) -> Result<Option<StartKind>, SessionError> {
        let plan = self.plan.as_ref().ok_or(SessionError::NoRoutineSelected)?;
        if plan.is_empty() {
            return Err(SessionError::EmptyRoutine);
        }
        if let Some(state) = self.state.as_mut() {
            if state.completed {
                return Err(SessionError::AlreadyCompleted);
            }
            if state.running {
                return Ok(None);
            }
            state.running = true;
            return Ok(Some(StartKind::Resumed));
        }
        self.state = Some(SessionState::fresh(plan));
        Ok(Some(StartKind::Fresh))
    }

    /// Stop advancing without touching the position. Returns whether the
    /// session was running.
    pub fn pause(&mut self) -> bool {
        match &mut self.state {
            Some(state) if state.running => {
                state.running = false;
                true
            }
            _ => false,
        }
    }

    /// Discard the session. Returns whether there was one.
    pub fn reset(&mut self) -> bool {
        self.state.take().is_some()
    }

    /// Advance by `delta_secs` of wall-clock time.
    ///
    /// Returns `None` when not running; the caller stops scheduling frames.
    /// Non-finite or negative deltas count as zero.
    pub fn advance(&mut self, delta_secs: f64) -> Option<Tick> {
        let plan = self.plan.as_ref()?;
        let state = self.state.as_mut()?;
        if !state.running {
            return None;
        }
        let delta = if delta_secs.is_finite() && delta_secs > 0.0 {
            delta_secs
        } else {
            0.0
        };

        if state.in_transition {
            state.transition_elapsed += delta;
            if state.transition_elapsed < TRANSITION_DELAY_SECS {
                return Some(Tick {
                    frame: resting(state),
                    phase_changed: None,
                    transition_started: false,
                });
            }
            state.in_transition = false;
            state.transition_elapsed = 0.0;
            return Some(report(plan, state));
        }

        state.elapsed_in_step += delta;
        let Some(step) = plan.step(state.cycle_index, state.step_index) else {
            return Some(finish(state));
        };
        if step.duration_seconds > 0.0 && state.elapsed_in_step < step.duration_seconds {
            return Some(report(plan, state));
        }

        // Step boundary.
        let finished = step.kind;
        state.elapsed_in_step = 0.0;
        state.step_index += 1;
        if state.step_index >= plan.cycles[state.cycle_index].steps.len() {
            state.step_index = 0;
            state.repetitions_left = state.repetitions_left.saturating_sub(1);
            if state.repetitions_left == 0 {
                state.cycle_index += 1;
                match plan.cycles.get(state.cycle_index) {
                    Some(next) => state.repetitions_left = next.effective_repetitions(),
                    None => return Some(finish(state)),
                }
            }
        }

        let Some(next) = plan.step(state.cycle_index, state.step_index) else {
            return Some(finish(state));
        };
        if finished == StepKind::Exhale && next.kind == StepKind::Inhale {
            state.in_transition = true;
            state.transition_elapsed = 0.0;
            return Some(Tick {
                frame: resting(state),
                phase_changed: None,
                transition_started: true,
            });
        }

        Some(report(plan, state))
    }
}

fn position_of(plan: &SessionPlan, state: &SessionState) -> Option<StepPosition> {
    let cycle = plan.cycles.get(state.cycle_index)?;
    let step = cycle.steps.get(state.step_index)?;
    let progress = if step.duration_seconds > 0.0 {
        (state.elapsed_in_step / step.duration_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let repetitions = cycle.effective_repetitions();
    Some(StepPosition {
        kind: step.kind,
        exhale_route: step.exhale_route,
        duration_seconds: step.duration_seconds,
        progress,
        cycle_index: state.cycle_index,
        cycle_count: plan.cycles.len(),
        step_index: state.step_index,
        repetition: repetitions.saturating_sub(state.repetitions_left) + 1,
        repetitions,
    })
}

/// Report the current step, flagging a phase change when its kind is new.
fn report(plan: &SessionPlan, state: &mut SessionState) -> Tick {
    let Some(position) = position_of(plan, state) else {
        return finish(state);
    };
    let phase_changed = if state.current_phase != Some(position.kind) {
        state.current_phase = Some(position.kind);
        Some(position.kind)
    } else {
        None
    };
    Tick {
        frame: ClockFrame::Step(position),
        phase_changed,
        transition_started: false,
    }
}

fn resting(state: &SessionState) -> ClockFrame {
    ClockFrame::Resting {
        cycle_index: state.cycle_index,
        remaining_secs: (TRANSITION_DELAY_SECS - state.transition_elapsed).max(0.0),
    }
}

fn finish(state: &mut SessionState) -> Tick {
    state.running = false;
    state.completed = true;
    state.in_transition = false;
    state.transition_elapsed = 0.0;
    Tick {
        frame: ClockFrame::Completed,
        phase_changed: None,
        transition_started: false,
    }
}
