//! Session controller: the single owner of everything a playing session
//! touches.
//!
//! Ties the selected routine, the [`SessionClock`], the [`Renderer`] and the
//! [`LifecycleGuard`] together. Front-ends feed it commands and frame
//! timestamps; it answers with rendered [`Frame`]s and [`Event`]s.

use chrono::Utc;
use tracing::{debug, info};

use super::clock::{ClockFrame, SessionClock, SessionPlan, SessionStatus, StartKind};
use super::lifecycle::{LifecycleGuard, Notice, NotifyPrefs};
use super::renderer::{Frame, Renderer, ScaleLayout};
use crate::events::Event;
use crate::routine::RoutineDefinition;
use crate::storage::Config;

/// Output of one advanced frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    pub frame: Frame,
    pub events: Vec<Event>,
}

pub struct SessionController {
    routine: Option<RoutineDefinition>,
    clock: SessionClock,
    renderer: Renderer,
    guard: LifecycleGuard,
    /// Timestamp of the previous frame; `None` restarts delta measurement.
    last_timestamp_ms: Option<f64>,
    current: Frame,
}

impl SessionController {
    pub fn new(renderer: Renderer, guard: LifecycleGuard) -> Self {
        Self {
            routine: None,
            clock: SessionClock::new(),
            renderer,
            guard,
            last_timestamp_ms: None,
            current: Frame::neutral(),
        }
    }

    /// Controller without platform capabilities, laid out and configured
    /// from `config`.
    pub fn from_config(config: &Config) -> Self {
        let renderer = Renderer::new(ScaleLayout::new(
            config.layout.shell_size,
            config.layout.core_size,
        ));
        Self::new(renderer, LifecycleGuard::headless(prefs_from(config)))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn routine(&self) -> Option<&RoutineDefinition> {
        self.routine.as_ref()
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn guard(&self) -> &LifecycleGuard {
        &self.guard
    }

    pub fn status(&self) -> SessionStatus {
        self.clock.status()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Whether frames should currently be scheduled.
    pub fn should_tick(&self) -> bool {
        self.clock.is_running() && self.guard.is_visible()
    }

    pub fn current_frame(&self) -> &Frame {
        &self.current
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let state = self.clock.state();
        Event::StateSnapshot {
            status: self.clock.status(),
            routine_id: self.clock.plan().map(|p| p.routine_id.clone()),
            cycle_index: state.map(|s| s.cycle_index).unwrap_or(0),
            step_index: state.map(|s| s.step_index).unwrap_or(0),
            elapsed_in_step: state.map(|s| s.elapsed_in_step).unwrap_or(0.0),
            repetitions_left: state.map(|s| s.repetitions_left).unwrap_or(0),
            in_transition: state.map(|s| s.in_transition).unwrap_or(false),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Make `routine` the active one. Any session in progress is dropped.
    pub fn select(&mut self, routine: RoutineDefinition) {
        info!(routine_id = %routine.id, "routine selected");
        self.clock.load(SessionPlan::from_routine(&routine));
        self.routine = Some(routine);
        self.stop_visuals();
    }

    pub fn set_prefs(&mut self, prefs: NotifyPrefs) {
        self.guard.set_prefs(prefs);
    }

    /// Start or resume. `None` when already running.
    pub fn start(&mut self) -> Option<Event> {
        match self.clock.start() {
            Ok(Some(kind)) => {
                self.last_timestamp_ms = None;
                self.guard.acquire();
                let routine_id = self.routine_id();
                info!(%routine_id, ?kind, "session started");
                Some(Event::SessionStarted {
                    routine_id,
                    resumed: kind == StartKind::Resumed,
                    at: Utc::now(),
                })
            }
            Ok(None) => None,
            Err(reason) => {
                debug!(%reason, "start rejected");
                Some(Event::StartRejected {
                    reason,
                    at: Utc::now(),
                })
            }
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.clock.pause() {
            return None;
        }
        self.last_timestamp_ms = None;
        self.guard.release();
        if let Some(position) = self.clock.position() {
            self.current = self.renderer.render(&position, true);
        }
        let state = self.clock.state()?;
        Some(Event::SessionPaused {
            cycle_index: state.cycle_index,
            step_index: state.step_index,
            elapsed_in_step: state.elapsed_in_step,
            at: Utc::now(),
        })
    }

    /// Back to `Idle` with the circle at rest and all counters cleared.
    pub fn reset(&mut self) -> Event {
        if self.clock.reset() {
            info!(routine_id = %self.routine_id(), "session reset");
        }
        self.stop_visuals();
        Event::SessionReset { at: Utc::now() }
    }

    /// Per-frame entry point for timestamp-driven loops.
    ///
    /// Delta is measured against the previous call; the first frame after
    /// start, resume or a return to the foreground advances by 0. Returns
    /// `None` when no frame should be drawn, which ends the frame chain.
    pub fn frame(&mut self, timestamp_ms: f64) -> Option<FrameUpdate> {
        if !self.should_tick() {
            self.last_timestamp_ms = None;
            return None;
        }
        let delta_secs = match self.last_timestamp_ms {
            Some(previous) => ((timestamp_ms - previous) / 1000.0).max(0.0),
            None => 0.0,
        };
        self.last_timestamp_ms = Some(timestamp_ms);
        self.advance(delta_secs)
    }

    /// Advance by an explicit delta, for deterministic drivers.
    pub fn advance(&mut self, delta_secs: f64) -> Option<FrameUpdate> {
        let tick = self.clock.advance(delta_secs)?;
        let mut events = Vec::new();

        if tick.transition_started {
            if let ClockFrame::Resting { cycle_index, .. } = tick.frame {
                events.push(Event::TransitionStarted {
                    cycle_index,
                    at: Utc::now(),
                });
            }
        }

        if let (Some(phase), ClockFrame::Step(position)) = (tick.phase_changed, tick.frame) {
            self.guard.notify(Notice::Phase(phase));
            events.push(Event::PhaseChanged {
                phase,
                exhale_route: position.exhale_route,
                cycle_index: position.cycle_index,
                step_index: position.step_index,
                repetition: position.repetition,
                repetitions: position.repetitions,
                at: Utc::now(),
            });
        }

        if tick.frame == ClockFrame::Completed {
            self.guard.notify(Notice::Complete);
            self.guard.release();
            self.last_timestamp_ms = None;
            let routine_id = self.routine_id();
            info!(%routine_id, "session completed");
            events.push(Event::SessionCompleted {
                routine_id,
                at: Utc::now(),
            });
        }

        self.current = self.renderer.render(&tick.frame, false);
        Some(FrameUpdate {
            frame: self.current.clone(),
            events,
        })
    }

    /// New circle sizes. The peak scale is re-measured and the current
    /// position repainted.
    pub fn resize(&mut self, outer: f64, inner: f64) -> Frame {
        self.renderer.resize(outer, inner);
        if let Some(position) = self.clock.position() {
            let paused = self.clock.status() == SessionStatus::Paused;
            self.current = self.renderer.render(&position, paused);
        }
        self.current.clone()
    }

    /// Foreground/background change. Frames stop while hidden; on return
    /// delta measurement restarts so hidden time is not played back.
    pub fn visibility_changed(&mut self, visible: bool) {
        debug!(visible, "visibility changed");
        self.guard.visibility_changed(visible, self.clock.is_running());
        self.last_timestamp_ms = None;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn routine_id(&self) -> String {
        self.clock
            .plan()
            .map(|p| p.routine_id.clone())
            .unwrap_or_default()
    }

    fn stop_visuals(&mut self) {
        self.guard.release();
        self.last_timestamp_ms = None;
        self.current = Frame::neutral();
    }
}

pub fn prefs_from(config: &Config) -> NotifyPrefs {
    NotifyPrefs {
        haptics_enabled: config.notifications.haptics,
        sound_enabled: config.notifications.sound,
    }
}
