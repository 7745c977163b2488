//! Frame scheduler: a tokio task that owns a [`SessionController`].
//!
//! All session mutation happens on this one task. Callers send commands
//! through a [`SessionHandle`] and read frames and events from the update
//! receiver. The task ticks at the frame period only while the session is
//! running and visible; otherwise it just waits for the next command.
//!
//! The loop never waits on the update reader. Frames are repaint state and
//! are dropped when the reader falls behind; events are queued until it
//! catches up.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use super::controller::SessionController;
use super::lifecycle::NotifyPrefs;
use super::renderer::Frame;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::routine::RoutineDefinition;

const COMMAND_CAPACITY: usize = 32;
const UPDATE_CAPACITY: usize = 256;

/// Update slots only events may fill.
pub const EVENT_HEADROOM: usize = 32;

#[derive(Debug)]
pub enum Command {
    Select(Box<RoutineDefinition>),
    Start,
    Pause,
    Reset,
    Resize { outer: f64, inner: f64 },
    Visibility(bool),
    Prefs(NotifyPrefs),
    Snapshot(oneshot::Sender<Event>),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Frame(Frame),
    Event(Event),
}

/// Frame period for a frame rate, kept within 1..=240 fps.
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(frame_rate.clamp(1, 240)))
}

/// Cheap, cloneable sender side of a running scheduler.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::SchedulerStopped)
    }

    pub async fn select(&self, routine: RoutineDefinition) -> Result<()> {
        self.send(Command::Select(Box::new(routine))).await
    }

    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    pub async fn resize(&self, outer: f64, inner: f64) -> Result<()> {
        self.send(Command::Resize { outer, inner }).await
    }

    pub async fn set_visible(&self, visible: bool) -> Result<()> {
        self.send(Command::Visibility(visible)).await
    }

    pub async fn set_prefs(&self, prefs: NotifyPrefs) -> Result<()> {
        self.send(Command::Prefs(prefs)).await
    }

    /// Current state, answered after every command sent before it.
    pub async fn snapshot(&self) -> Result<Event> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        answer.await.map_err(|_| CoreError::SchedulerStopped)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

/// Spawn the scheduler task. The join handle yields the controller back
/// once the task stops.
pub fn spawn(
    controller: SessionController,
    period: Duration,
) -> (SessionHandle, mpsc::Receiver<Update>, JoinHandle<SessionController>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (update_tx, update_rx) = mpsc::channel(UPDATE_CAPACITY);
    let task = tokio::spawn(run(controller, period, command_rx, update_tx));
    (SessionHandle { commands: command_tx }, update_rx, task)
}

async fn run(
    mut controller: SessionController,
    period: Duration,
    mut commands: mpsc::Receiver<Command>,
    updates: mpsc::Sender<Update>,
) -> SessionController {
    let origin = Instant::now();
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut outbox = Outbox::new(updates);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                if !apply(&mut controller, command, &mut outbox) {
                    break;
                }
            }
            _ = ticker.tick(), if controller.should_tick() => {
                let now_ms = origin.elapsed().as_secs_f64() * 1000.0;
                if let Some(update) = controller.frame(now_ms) {
                    for event in update.events {
                        outbox.event(event);
                    }
                    outbox.frame(update.frame);
                }
            }
            permit = outbox.sender().reserve_owned(), if outbox.is_backed_up() => {
                match permit {
                    Ok(permit) => outbox.flush_one(permit),
                    Err(_) => outbox.mark_closed(),
                }
            }
        }
    }

    debug!("session scheduler stopped");
    controller
}

/// Returns false when the loop should stop.
fn apply(controller: &mut SessionController, command: Command, outbox: &mut Outbox) -> bool {
    match command {
        Command::Select(routine) => {
            controller.select(*routine);
            outbox.frame(controller.current_frame().clone());
        }
        Command::Start => {
            if let Some(event) = controller.start() {
                outbox.event(event);
            }
        }
        Command::Pause => {
            if let Some(event) = controller.pause() {
                outbox.event(event);
                outbox.frame(controller.current_frame().clone());
            }
        }
        Command::Reset => {
            let event = controller.reset();
            outbox.event(event);
            outbox.frame(controller.current_frame().clone());
        }
        Command::Resize { outer, inner } => {
            let frame = controller.resize(outer, inner);
            outbox.frame(frame);
        }
        Command::Visibility(visible) => controller.visibility_changed(visible),
        Command::Prefs(prefs) => controller.set_prefs(prefs),
        Command::Snapshot(reply) => {
            let _ = reply.send(controller.snapshot());
        }
        Command::Shutdown => return false,
    }
    true
}

/// Sending side of the update channel. Never waits on the reader.
///
/// Events are kept in order: what does not fit waits in a backlog that the
/// run loop flushes as slots free up. Frames are dropped while anything is
/// backed up or fewer than [`EVENT_HEADROOM`] slots remain.
struct Outbox {
    updates: mpsc::Sender<Update>,
    backlog: VecDeque<Event>,
    closed: bool,
}

impl Outbox {
    fn new(updates: mpsc::Sender<Update>) -> Self {
        Self {
            updates,
            backlog: VecDeque::new(),
            closed: false,
        }
    }

    fn sender(&self) -> mpsc::Sender<Update> {
        self.updates.clone()
    }

    fn is_backed_up(&self) -> bool {
        !self.backlog.is_empty()
    }

    fn event(&mut self, event: Event) {
        if self.closed {
            return;
        }
        if self.is_backed_up() {
            self.backlog.push_back(event);
            return;
        }
        match self.updates.try_send(Update::Event(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(Update::Event(event))) => {
                debug!(event = event.name(), "update channel full, event queued");
                self.backlog.push_back(event);
            }
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => self.mark_closed(),
        }
    }

    fn frame(&mut self, frame: Frame) {
        if self.closed || self.is_backed_up() || self.updates.capacity() <= EVENT_HEADROOM {
            return;
        }
        if let Err(TrySendError::Closed(_)) = self.updates.try_send(Update::Frame(frame)) {
            self.mark_closed();
        }
    }

    fn flush_one(&mut self, permit: mpsc::OwnedPermit<Update>) {
        if let Some(event) = self.backlog.pop_front() {
            permit.send(Update::Event(event));
        }
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            debug!("update receiver dropped");
        }
        self.closed = true;
        self.backlog.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::routine::{CycleDefinition, ExhaleRoute, StepDefinition};
    use crate::session::clock::SessionStatus;
    use crate::session::lifecycle::LifecycleGuard;
    use crate::session::renderer::{FrameStatus, Renderer, ScaleLayout};

    fn routine() -> RoutineDefinition {
        RoutineDefinition {
            id: "short".into(),
            display_name: "Short".into(),
            name_key: None,
            scenario_label: "test".into(),
            scenario_key: None,
            category: "custom".into(),
            cycles: vec![CycleDefinition::new(
                1,
                vec![
                    StepDefinition::inhale(1.0),
                    StepDefinition::exhale(1.0, ExhaleRoute::Nose),
                ],
            )],
        }
    }

    fn controller() -> SessionController {
        SessionController::new(
            Renderer::new(ScaleLayout::new(200.0, 100.0)),
            LifecycleGuard::headless(NotifyPrefs::default()),
        )
    }

    fn drain(rx: &mut mpsc::Receiver<Update>) -> Vec<Update> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    #[test]
    fn frame_period_is_bounded() {
        assert_eq!(frame_period(0), Duration::from_secs(1));
        assert_eq!(frame_period(50), Duration::from_millis(20));
        assert_eq!(frame_period(10_000), frame_period(240));
    }

    #[tokio::test(start_paused = true)]
    async fn plays_routine_to_completion() {
        let (handle, mut rx, task) = spawn(controller(), Duration::from_millis(50));
        handle.select(routine()).await.unwrap();
        let started = Instant::now();
        handle.start().await.unwrap();

        let mut completed = false;
        let mut frames = 0;
        while let Some(update) = rx.recv().await {
            match update {
                Update::Frame(_) => frames += 1,
                Update::Event(Event::SessionCompleted { .. }) => {
                    completed = true;
                    break;
                }
                Update::Event(_) => {}
            }
        }
        assert!(completed);
        assert!(frames > 30);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1900), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(2200), "{elapsed:?}");

        handle.shutdown().await.unwrap();
        let controller = task.await.unwrap();
        assert_eq!(controller.status(), SessionStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_session_stops_ticking() {
        let (handle, mut rx, _task) = spawn(controller(), Duration::from_millis(50));
        handle.select(routine()).await.unwrap();
        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(500)).await;
        handle.pause().await.unwrap();
        let before = handle.snapshot().await.unwrap();
        drain(&mut rx);

        time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx).is_empty());
        let after = handle.snapshot().await.unwrap();
        match (before, after) {
            (
                Event::StateSnapshot { elapsed_in_step: a, status: SessionStatus::Paused, .. },
                Event::StateSnapshot { elapsed_in_step: b, .. },
            ) => assert_eq!(a, b),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_session_stops_ticking() {
        let (handle, mut rx, _task) = spawn(controller(), Duration::from_millis(50));
        handle.select(routine()).await.unwrap();
        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(300)).await;
        handle.set_visible(false).await.unwrap();
        handle.snapshot().await.unwrap();
        drain(&mut rx);

        time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut rx).is_empty());

        handle.set_visible(true).await.unwrap();
        let update = rx.recv().await.unwrap();
        match update {
            Update::Frame(frame) => {
                assert_eq!(frame.status, FrameStatus::Breathing);
                assert!(frame.progress < 0.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_routine_is_rejected() {
        let (handle, mut rx, _task) = spawn(controller(), Duration::from_millis(50));
        handle.start().await.unwrap();
        match rx.recv().await {
            Some(Update::Event(Event::StartRejected { reason, .. })) => {
                assert_eq!(reason, SessionError::NoRoutineSelected)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reset_publishes_neutral_frame() {
        let (handle, mut rx, _task) = spawn(controller(), Duration::from_millis(50));
        handle.select(routine()).await.unwrap();
        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(400)).await;
        handle.reset().await.unwrap();
        handle.snapshot().await.unwrap();

        let updates = drain(&mut rx);
        assert!(matches!(
            updates[updates.len() - 2],
            Update::Event(Event::SessionReset { .. })
        ));
        assert_eq!(updates.last(), Some(&Update::Frame(Frame::neutral())));
    }

    #[tokio::test(start_paused = true)]
    async fn unread_updates_do_not_block_commands() {
        let long_hold = RoutineDefinition {
            cycles: vec![CycleDefinition::new(100, vec![StepDefinition::hold(60.0)])],
            ..routine()
        };
        let (handle, mut rx, _task) = spawn(controller(), Duration::from_millis(16));
        handle.select(long_hold).await.unwrap();
        handle.start().await.unwrap();

        // Far more frames than the channel holds, none read.
        time::sleep(Duration::from_secs(10)).await;
        handle.pause().await.unwrap();
        let snapshot = time::timeout(Duration::from_secs(5), handle.snapshot())
            .await
            .expect("scheduler stalled")
            .unwrap();
        assert!(matches!(
            snapshot,
            Event::StateSnapshot { status: SessionStatus::Paused, .. }
        ));

        let updates = drain(&mut rx);
        assert!(updates.len() <= UPDATE_CAPACITY);
        assert!(matches!(updates.last(), Some(Update::Event(Event::SessionPaused { .. }))));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_events_arrive_in_order_once_read() {
        let (handle, mut rx, _task) = spawn(controller(), Duration::from_millis(16));
        handle.select(routine()).await.unwrap();
        handle.start().await.unwrap();
        time::sleep(Duration::from_secs(1)).await;
        for _ in 0..UPDATE_CAPACITY {
            handle.reset().await.unwrap();
        }
        handle.start().await.unwrap();
        handle.snapshot().await.unwrap();

        let mut resets = 0;
        let mut last = None;
        while let Ok(Some(update)) = time::timeout(Duration::from_millis(100), rx.recv()).await {
            if let Update::Event(event) = update {
                if matches!(event, Event::SessionReset { .. }) {
                    resets += 1;
                }
                last = Some(event);
            }
        }
        assert_eq!(resets, UPDATE_CAPACITY);
        assert!(matches!(last, Some(Event::SessionCompleted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_errors_after_shutdown() {
        let (handle, _rx, task) = spawn(controller(), Duration::from_millis(50));
        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(matches!(handle.start().await, Err(CoreError::SchedulerStopped)));
    }
}
