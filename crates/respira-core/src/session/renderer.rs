//! Session renderer: maps clock output onto the breathing circle.
//!
//! The circle grows from scale 1 to `max_scale` while inhaling, stays at the
//! peak while holding, and shrinks back while exhaling. `max_scale` is the
//! ratio of the outer shell to the inner core, measured lazily and dropped on
//! every resize.

use serde::Serialize;

use super::clock::{ClockFrame, StepPosition};
use crate::routine::{ExhaleRoute, StepKind};

/// Scale of the circle at rest.
pub const NEUTRAL_SCALE: f64 = 1.0;

/// Outer/inner circle sizes and the cached peak scale derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleLayout {
    outer: f64,
    inner: f64,
    cached: Option<f64>,
}

impl ScaleLayout {
    pub fn new(outer: f64, inner: f64) -> Self {
        Self {
            outer,
            inner,
            cached: None,
        }
    }

    /// Layout with nothing measured yet; peaks at the neutral scale.
    pub fn unmeasured() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn resize(&mut self, outer: f64, inner: f64) {
        self.outer = outer;
        self.inner = inner;
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// Peak scale, at least 1. Unmeasurable sizes give 1.
    pub fn max_scale(&mut self) -> f64 {
        if let Some(scale) = self.cached {
            return scale;
        }
        let scale = measure(self.outer, self.inner);
        self.cached = Some(scale);
        scale
    }
}

impl Default for ScaleLayout {
    fn default() -> Self {
        Self::unmeasured()
    }
}

fn measure(outer: f64, inner: f64) -> f64 {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(outer) || !valid(inner) {
        return NEUTRAL_SCALE;
    }
    (outer / inner).max(NEUTRAL_SCALE)
}

/// Circle scale for a step at `progress`.
pub fn scale_for(kind: StepKind, progress: f64, max_scale: f64) -> f64 {
    let progress = progress.clamp(0.0, 1.0);
    match kind {
        StepKind::Inhale => 1.0 + progress * (max_scale - 1.0),
        StepKind::Exhale => max_scale - progress * (max_scale - 1.0),
        StepKind::Hold => max_scale,
    }
}

/// Whole seconds left, shown for hold and exhale steps.
pub fn countdown(kind: StepKind, duration_seconds: f64, progress: f64) -> Option<u32> {
    match kind {
        StepKind::Inhale => None,
        StepKind::Hold | StepKind::Exhale => {
            let remaining = (duration_seconds - duration_seconds * progress).ceil();
            Some(remaining.max(0.0) as u32)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStatus {
    Idle,
    Breathing,
    Resting,
    Paused,
    Completed,
}

/// One painted state of the session view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub status: FrameStatus,
    pub phase: Option<StepKind>,
    pub exhale_route: Option<ExhaleRoute>,
    pub progress: f64,
    pub scale: f64,
    pub countdown: Option<u32>,
    /// 1-based.
    pub cycle_number: Option<usize>,
    pub cycle_count: Option<usize>,
    /// 1-based.
    pub repetition_number: Option<u32>,
    pub repetition_count: Option<u32>,
}

impl Frame {
    /// Circle at rest with all counters cleared.
    pub fn neutral() -> Self {
        Self::bare(FrameStatus::Idle)
    }

    fn bare(status: FrameStatus) -> Self {
        Self {
            status,
            phase: None,
            exhale_route: None,
            progress: 0.0,
            scale: NEUTRAL_SCALE,
            countdown: None,
            cycle_number: None,
            cycle_count: None,
            repetition_number: None,
            repetition_count: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    layout: ScaleLayout,
}

impl Renderer {
    pub fn new(layout: ScaleLayout) -> Self {
        Self { layout }
    }

    pub fn resize(&mut self, outer: f64, inner: f64) {
        self.layout.resize(outer, inner);
    }

    pub fn max_scale(&mut self) -> f64 {
        self.layout.max_scale()
    }

    /// Paint a clock frame. `paused` marks a step frame as held still.
    pub fn render(&mut self, frame: &ClockFrame, paused: bool) -> Frame {
        match frame {
            ClockFrame::Step(position) => self.render_step(position, paused),
            ClockFrame::Resting { cycle_index, .. } => {
                let mut out = Frame::bare(if paused {
                    FrameStatus::Paused
                } else {
                    FrameStatus::Resting
                });
                out.cycle_number = Some(cycle_index + 1);
                out
            }
            ClockFrame::Completed => Frame::bare(FrameStatus::Completed),
        }
    }

    fn render_step(&mut self, position: &StepPosition, paused: bool) -> Frame {
        let max_scale = self.max_scale();
        Frame {
            status: if paused {
                FrameStatus::Paused
            } else {
                FrameStatus::Breathing
            },
            phase: Some(position.kind),
            exhale_route: position.exhale_route,
            progress: position.progress,
            scale: scale_for(position.kind, position.progress, max_scale),
            countdown: countdown(position.kind, position.duration_seconds, position.progress),
            cycle_number: Some(position.cycle_index + 1),
            cycle_count: Some(position.cycle_count),
            repetition_number: Some(position.repetition),
            repetition_count: Some(position.repetitions),
        }
    }
}
