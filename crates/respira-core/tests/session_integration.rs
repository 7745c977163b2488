//! Integration tests for the session player.
//!
//! These drive the clock and the controller through whole sessions and pin
//! the timing, phase and scale behavior end to end.

use std::collections::HashMap;

use proptest::prelude::*;
use respira_core::routine::{CycleDefinition, ExhaleRoute, RoutineDefinition, StepDefinition, StepKind};
use respira_core::session::{
    ClockFrame, FrameStatus, LifecycleGuard, NotifyPrefs, Renderer, ScaleLayout, SessionClock,
    SessionController, SessionPlan, SessionStatus, TRANSITION_DELAY_SECS,
};
use respira_core::{default_routines, Event, SessionError};

fn routine(cycles: Vec<CycleDefinition>) -> RoutineDefinition {
    RoutineDefinition {
        id: "integration".into(),
        display_name: "Integration".into(),
        name_key: None,
        scenario_label: "test".into(),
        scenario_key: None,
        category: "custom".into(),
        cycles,
    }
}

fn controller() -> SessionController {
    SessionController::new(
        Renderer::new(ScaleLayout::new(280.0, 140.0)),
        LifecycleGuard::headless(NotifyPrefs::default()),
    )
}

#[test]
fn test_triangle_two_repetitions_scenario() {
    let mut ctl = controller();
    ctl.select(routine(vec![CycleDefinition::new(
        2,
        vec![
            StepDefinition::inhale(4.0),
            StepDefinition::hold(4.0),
            StepDefinition::exhale(4.0, ExhaleRoute::Nose),
        ],
    )]));
    assert!(matches!(ctl.start(), Some(Event::SessionStarted { .. })));
    ctl.advance(0.0).unwrap();

    // First repetition ends on the exhale -> inhale rest.
    let mut last = None;
    for _ in 0..12 {
        last = ctl.advance(1.0);
    }
    let update = last.unwrap();
    assert_eq!(update.frame.status, FrameStatus::Resting);
    assert!(update
        .events
        .iter()
        .any(|e| matches!(e, Event::TransitionStarted { .. })));

    let mut elapsed = 12.0;
    let mut completions = 0;
    let mut second_pass = false;
    while let Some(update) = ctl.advance(1.0) {
        elapsed += 1.0;
        second_pass |= update.events.iter().any(|e| {
            matches!(
                e,
                Event::PhaseChanged { phase: StepKind::Inhale, repetition: 2, repetitions: 2, .. }
            )
        });
        completions += update
            .events
            .iter()
            .filter(|e| matches!(e, Event::SessionCompleted { .. }))
            .count();
    }
    assert_eq!(completions, 1);
    assert!(second_pass);
    assert!(elapsed >= 24.0 + TRANSITION_DELAY_SECS);
    assert_eq!(ctl.status(), SessionStatus::Completed);
}

#[test]
fn test_empty_routine_never_starts() {
    let mut ctl = controller();
    ctl.select(routine(vec![CycleDefinition::new(3, vec![])]));
    match ctl.start() {
        Some(Event::StartRejected { reason, .. }) => assert_eq!(reason, SessionError::EmptyRoutine),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(ctl.status(), SessionStatus::Idle);
    assert!(ctl.advance(1.0).is_none());
    assert!(!ctl.guard().is_held());
}

#[test]
fn test_pause_resume_without_time_keeps_position() {
    let mut clock = SessionClock::with_plan(SessionPlan::from_routine(&default_routines()[2]));
    clock.start().unwrap();
    for delta in [0.0, 3.0, 2.5, 4.75, 0.1] {
        clock.advance(delta);
    }
    let before = clock.state().unwrap().clone();
    clock.pause();
    clock.start().unwrap();
    let after = clock.state().unwrap();
    assert_eq!(
        (after.cycle_index, after.step_index, after.elapsed_in_step, after.repetitions_left),
        (before.cycle_index, before.step_index, before.elapsed_in_step, before.repetitions_left)
    );
}

#[test]
fn test_scale_follows_phase_through_box_routine() {
    let mut ctl = controller();
    ctl.select(default_routines().remove(0));
    ctl.start();
    let first = ctl.advance(0.0).unwrap().frame;
    assert_eq!(first.phase, Some(StepKind::Inhale));
    assert_eq!(first.scale, 1.0);

    // Hold at the peak for its whole duration.
    ctl.advance(4.0);
    for _ in 0..3 {
        let frame = ctl.advance(1.0).unwrap().frame;
        assert_eq!(frame.phase, Some(StepKind::Hold));
        assert_eq!(frame.scale, 2.0);
    }

    let exhale = ctl.advance(1.0).unwrap().frame;
    assert_eq!(exhale.phase, Some(StepKind::Exhale));
    assert_eq!(exhale.exhale_route, Some(ExhaleRoute::Mouth));
    assert_eq!(exhale.scale, 2.0);
    assert_eq!(exhale.countdown, Some(4));
    let late = ctl.advance(3.0).unwrap().frame;
    assert_eq!(late.scale, 1.25);
    assert_eq!(late.countdown, Some(1));
}

#[test]
fn test_every_preset_completes() {
    for preset in default_routines() {
        let plan = SessionPlan::from_routine(&preset);
        let expected = plan.total_duration_secs()
            + plan.transition_count() as f64 * TRANSITION_DELAY_SECS;
        let mut clock = SessionClock::with_plan(plan);
        clock.start().unwrap();
        clock.advance(0.0);
        let mut elapsed = 0.0;
        while clock.advance(0.5).is_some() {
            elapsed += 0.5;
        }
        assert_eq!(clock.status(), SessionStatus::Completed, "{}", preset.id);
        assert_eq!(elapsed, expected, "{}", preset.id);
    }
}

fn step_strategy() -> impl Strategy<Value = StepDefinition> {
    (0u8..3, 1u32..=5, any::<bool>()).prop_map(|(kind, secs, mouth)| {
        let secs = f64::from(secs);
        match kind {
            0 => StepDefinition::inhale(secs),
            1 => StepDefinition::hold(secs),
            _ => StepDefinition::exhale(
                secs,
                if mouth { ExhaleRoute::Mouth } else { ExhaleRoute::Nose },
            ),
        }
    })
}

fn plan_strategy() -> impl Strategy<Value = SessionPlan> {
    let cycle = (1u32..=3, prop::collection::vec(step_strategy(), 1..=4))
        .prop_map(|(reps, steps)| CycleDefinition::new(reps, steps));
    prop::collection::vec(cycle, 1..=3).prop_map(|cycles| SessionPlan {
        routine_id: "prop".into(),
        cycles,
    })
}

proptest! {
    #[test]
    fn prop_completes_exactly_once_after_total_duration(
        plan in plan_strategy(),
        delta in prop::sample::select(vec![0.25, 0.5, 1.0]),
    ) {
        let expected = plan.total_duration_secs()
            + plan.transition_count() as f64 * TRANSITION_DELAY_SECS;
        let mut clock = SessionClock::with_plan(plan.clone());
        clock.start().unwrap();

        let mut elapsed = 0.0;
        let mut completions = 0;
        let mut visits: HashMap<(usize, usize), u32> = HashMap::new();
        let mut previous = None;
        for step in std::iter::once(0.0).chain(std::iter::repeat(delta)) {
            let Some(tick) = clock.advance(step) else { break };
            elapsed += step;
            match tick.frame {
                ClockFrame::Completed => completions += 1,
                ClockFrame::Step(p) => {
                    let key = (p.cycle_index, p.repetition, p.step_index);
                    if previous != Some(key) {
                        *visits.entry((p.cycle_index, p.step_index)).or_default() += 1;
                        previous = Some(key);
                    }
                }
                ClockFrame::Resting { .. } => {}
            }
        }

        prop_assert_eq!(completions, 1);
        prop_assert_eq!(elapsed, expected);
        for (c, cycle) in plan.cycles.iter().enumerate() {
            for s in 0..cycle.steps.len() {
                let seen = visits.get(&(c, s)).copied().unwrap_or(0);
                prop_assert_eq!(seen, cycle.repetitions);
            }
        }
    }

    #[test]
    fn prop_progress_is_monotonic_within_a_step(
        plan in plan_strategy(),
        deltas in prop::collection::vec(0.01f64..0.7, 1..64),
    ) {
        let mut clock = SessionClock::with_plan(plan);
        clock.start().unwrap();

        let mut previous: Option<((usize, u32, usize), f64)> = None;
        let mut last_kind: Option<StepKind> = None;
        let mut resting_after: Option<Option<StepKind>> = None;
        let mut completions = 0;
        let mut frames = 0usize;

        for delta in std::iter::once(0.0).chain(deltas.iter().copied().cycle()) {
            frames += 1;
            prop_assert!(frames < 1_000_000);
            let Some(tick) = clock.advance(delta) else { break };
            if tick.transition_started {
                resting_after = Some(last_kind);
            }
            match tick.frame {
                ClockFrame::Step(p) => {
                    prop_assert!((0.0..1.0).contains(&p.progress));
                    let key = (p.cycle_index, p.repetition, p.step_index);
                    let entered = previous.map(|(k, _)| k) != Some(key);
                    match previous {
                        Some((k, progress)) if k == key => prop_assert!(p.progress >= progress),
                        _ => prop_assert_eq!(p.progress, 0.0),
                    }
                    if let Some(before) = resting_after.take() {
                        prop_assert_eq!(before, Some(StepKind::Exhale));
                        prop_assert_eq!(p.kind, StepKind::Inhale);
                    } else if entered && last_kind == Some(StepKind::Exhale) {
                        prop_assert_ne!(p.kind, StepKind::Inhale);
                    }
                    previous = Some((key, p.progress));
                    last_kind = Some(p.kind);
                }
                ClockFrame::Resting { .. } => {}
                ClockFrame::Completed => completions += 1,
            }
        }
        prop_assert_eq!(completions, 1);
    }
}
