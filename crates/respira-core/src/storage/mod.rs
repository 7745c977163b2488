mod config;
pub mod database;
pub mod routine_store;

pub use config::{Config, LayoutConfig, NotificationsConfig, SessionConfig, UiConfig};
pub use database::Database;
pub use routine_store::{RoutineStore, ROUTINES_KEY};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the data directory, creating it if needed.
///
/// `RESPIRA_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/respira[-dev]/`, with `RESPIRA_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("RESPIRA_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("RESPIRA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("respira-dev")
            } else {
                base_dir.join("respira")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
