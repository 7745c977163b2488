//! Lifecycle guard: side effects tied to session liveness.
//!
//! Keeps the screen awake while a session plays and turns phase changes into
//! haptic and audio cues. Every platform capability is best-effort: a missing
//! or failing capability is logged at debug level and otherwise ignored.

use tracing::debug;

use crate::error::CapabilityError;
use crate::routine::StepKind;

/// Screen stay-awake handle.
pub trait WakeLock: Send {
    fn acquire(&mut self) -> Result<(), CapabilityError>;
    fn release(&mut self);
}

/// Vibration motor. `pattern` alternates on/off durations in milliseconds.
pub trait Haptics: Send {
    fn vibrate(&mut self, pattern: &[u32]) -> Result<(), CapabilityError>;
}

/// Audio cue player.
pub trait SoundCue: Send {
    fn play(&mut self, cue: Notice);
}

/// What the guard is asked to announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Phase(StepKind),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPattern {
    Light,
    Medium,
    Success,
}

impl HapticPattern {
    pub fn for_notice(notice: Notice) -> Self {
        match notice {
            Notice::Phase(StepKind::Hold) => HapticPattern::Light,
            Notice::Phase(_) => HapticPattern::Medium,
            Notice::Complete => HapticPattern::Success,
        }
    }

    pub fn millis(&self) -> &'static [u32] {
        match self {
            HapticPattern::Light => &[15],
            HapticPattern::Medium => &[35],
            HapticPattern::Success => &[40, 60, 40],
        }
    }
}

/// Stand-in for platforms without a wake lock or vibration motor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl WakeLock for Unsupported {
    fn acquire(&mut self) -> Result<(), CapabilityError> {
        Err(CapabilityError::Unsupported("wake lock"))
    }

    fn release(&mut self) {}
}

impl Haptics for Unsupported {
    fn vibrate(&mut self, _pattern: &[u32]) -> Result<(), CapabilityError> {
        Err(CapabilityError::Unsupported("vibration"))
    }
}

/// Audio cues are not produced yet; the hook stays so players can plug in.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCue;

impl SoundCue for SilentCue {
    fn play(&mut self, _cue: Notice) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyPrefs {
    pub haptics_enabled: bool,
    pub sound_enabled: bool,
}

impl Default for NotifyPrefs {
    fn default() -> Self {
        Self {
            haptics_enabled: true,
            sound_enabled: true,
        }
    }
}

pub struct LifecycleGuard {
    wake_lock: Box<dyn WakeLock>,
    haptics: Box<dyn Haptics>,
    sound: Box<dyn SoundCue>,
    prefs: NotifyPrefs,
    held: bool,
    visible: bool,
}

impl LifecycleGuard {
    pub fn new(
        wake_lock: Box<dyn WakeLock>,
        haptics: Box<dyn Haptics>,
        sound: Box<dyn SoundCue>,
        prefs: NotifyPrefs,
    ) -> Self {
        Self {
            wake_lock,
            haptics,
            sound,
            prefs,
            held: false,
            visible: true,
        }
    }

    /// Guard with no platform capabilities.
    pub fn headless(prefs: NotifyPrefs) -> Self {
        Self::new(
            Box::new(Unsupported),
            Box::new(Unsupported),
            Box::new(SilentCue),
            prefs,
        )
    }

    pub fn prefs(&self) -> NotifyPrefs {
        self.prefs
    }

    pub fn set_prefs(&mut self, prefs: NotifyPrefs) {
        self.prefs = prefs;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Ask to keep the screen awake. Idempotent.
    pub fn acquire(&mut self) {
        if self.held || !self.visible {
            return;
        }
        match self.wake_lock.acquire() {
            Ok(()) => self.held = true,
            Err(e) => debug!(error = %e, "wake lock unavailable"),
        }
    }

    pub fn release(&mut self) {
        if self.held {
            self.wake_lock.release();
            self.held = false;
        }
    }

    /// Track foreground visibility. Hiding drops the wake lock (platforms
    /// revoke it anyway); returning while `session_running` re-acquires it.
    pub fn visibility_changed(&mut self, visible: bool, session_running: bool) {
        self.visible = visible;
        if !visible {
            self.release();
        } else if session_running {
            self.acquire();
        }
    }

    /// Fire the haptic and audio cues for `notice`, honoring the settings.
    pub fn notify(&mut self, notice: Notice) {
        if self.prefs.haptics_enabled {
            let pattern = HapticPattern::for_notice(notice);
            if let Err(e) = self.haptics.vibrate(pattern.millis()) {
                debug!(error = %e, ?pattern, "haptic cue skipped");
            }
        }
        if self.prefs.sound_enabled {
            self.sound.play(notice);
        }
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        self.release();
    }
}
