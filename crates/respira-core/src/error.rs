//! Core error types for respira-core.
//!
//! Nothing in this crate is fatal to the process. Malformed persisted data is
//! recovered inside the routine store and missing platform capabilities are
//! degraded inside the lifecycle guard, so the errors below only surface for
//! storage I/O, configuration edits, invalid user-authored routines, and
//! rejected session starts.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for respira-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid user-authored data
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session command rejected
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The session scheduler task is gone
    #[error("Session scheduler stopped")]
    SchedulerStopped,

}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors for routines authored through the builder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Every cycle in the draft has zero steps
    #[error("Routine has no steps: at least one cycle needs a step")]
    EmptyRoutine,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// No routine with the given id
    #[error("Routine not found: {0}")]
    NotFound(String),
}

/// Reasons a session start is refused.
///
/// These are reported inline (status text), never treated as failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionError {
    #[error("No routine selected")]
    NoRoutineSelected,

    #[error("Routine has no steps to play")]
    EmptyRoutine,

    #[error("Session already completed; reset before starting again")]
    AlreadyCompleted,
}

/// A platform capability (wake lock, vibration) is absent or refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
