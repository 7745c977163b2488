//! Breathing-session player.
//!
//! - [`clock`]: delta-driven state machine over cycles, repetitions and steps
//! - [`renderer`]: maps clock output to circle scale and countdown
//! - [`lifecycle`]: wake lock and haptic/audio cues
//! - [`controller`]: single owner tying the three together
//! - [`scheduler`]: tokio task that drives a controller at frame cadence

pub mod clock;
pub mod controller;
pub mod lifecycle;
pub mod renderer;
pub mod scheduler;

pub use clock::{
    ClockFrame, SessionClock, SessionPlan, SessionState, SessionStatus, StartKind, StepPosition,
    Tick, TRANSITION_DELAY_SECS,
};
pub use controller::{FrameUpdate, SessionController};
pub use lifecycle::{
    HapticPattern, Haptics, LifecycleGuard, Notice, NotifyPrefs, SoundCue, WakeLock,
};
pub use renderer::{Frame, FrameStatus, Renderer, ScaleLayout};
pub use scheduler::{frame_period, SessionHandle, Update};
