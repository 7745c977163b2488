//! # Respira Core Library
//!
//! Core logic for the Respira guided-breathing app. Every operation is
//! reachable from the standalone `respira` CLI; any graphical shell is a thin
//! layer over the same library.
//!
//! ## Architecture
//!
//! - **Session**: a delta-driven clock that walks cycles, repetitions and
//!   steps, a renderer that turns progress into a circle scale, and a
//!   lifecycle guard for wake lock and haptic cues, owned by one controller
//!   and optionally driven by a tokio scheduler task
//! - **Routines**: routine definitions, legacy document migration and the
//!   validating editor draft
//! - **Storage**: SQLite key-value document store and TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionClock`]: the session state machine
//! - [`SessionController`]: clock, renderer and guard behind one API
//! - [`RoutineStore`]: persisted routine list
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod i18n;
pub mod routine;
pub mod session;
pub mod storage;

pub use error::{CoreError, ConfigError, SessionError, StorageError, ValidationError};
pub use events::Event;
pub use i18n::{Catalog, Language};
pub use routine::{
    default_routines, CycleDefinition, ExhaleRoute, RoutineDefinition, RoutineDraft,
    StepDefinition, StepKind,
};
pub use session::{Frame, SessionClock, SessionController, SessionPlan, SessionStatus};
pub use storage::{Config, Database, RoutineStore};
