//! Persisted routine list.
//!
//! The whole ordered list lives in one JSON document under [`ROUTINES_KEY`]
//! and is rewritten on every mutation. Reads normalize legacy shapes; a
//! document that cannot be read is replaced by the built-in samples without
//! surfacing an error.

use serde_json::Value;
use tracing::{info, warn};

use super::database::Database;
use crate::error::{CoreError, StorageError, ValidationError};
use crate::routine::{default_routines, migrations, RoutineDefinition, RoutineDraft};

/// Key of the routine document in the kv store.
pub const ROUTINES_KEY: &str = "respira:routines";

pub struct RoutineStore {
    db: Database,
}

impl RoutineStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the store on the default database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open() -> Result<Self, StorageError> {
        Ok(Self::new(Database::open()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Normalize one raw routine into the current shape.
    pub fn normalize(raw: Value) -> Result<RoutineDefinition, serde_json::Error> {
        migrations::normalize(raw)
    }

    /// Load every routine in order.
    ///
    /// The first load seeds and persists the samples. A malformed document
    /// falls back to the samples (logged, not returned as an error).
    ///
    /// # Errors
    /// Returns an error only if the database itself fails.
    pub fn load(&self) -> Result<Vec<RoutineDefinition>, StorageError> {
        let Some(raw) = self.db.kv_get(ROUTINES_KEY)? else {
            info!("no stored routines, seeding samples");
            let routines = default_routines();
            self.save(&routines)?;
            return Ok(routines);
        };

        match parse_document(&raw) {
            Ok(routines) => Ok(routines),
            Err(e) => {
                warn!(error = %e, "failed to parse stored routines, using samples");
                Ok(default_routines())
            }
        }
    }

    /// Replace the stored list.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, routines: &[RoutineDefinition]) -> Result<(), StorageError> {
        let json = serde_json::to_string(routines)
            .map_err(|e| StorageError::QueryFailed(format!("serialize routines: {e}")))?;
        self.db.kv_set(ROUTINES_KEY, &json)
    }

    pub fn get(&self, id: &str) -> Result<Option<RoutineDefinition>, StorageError> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }

    /// Replace the routine with the same id, or append it.
    pub fn upsert(&self, routine: RoutineDefinition) -> Result<Vec<RoutineDefinition>, StorageError> {
        let mut routines = self.load()?;
        match routines.iter_mut().find(|r| r.id == routine.id) {
            Some(slot) => *slot = routine,
            None => routines.push(routine),
        }
        self.save(&routines)?;
        Ok(routines)
    }

    /// Remove a routine. Returns whether one was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut routines = self.load()?;
        let before = routines.len();
        routines.retain(|r| r.id != id);
        if routines.len() == before {
            return Ok(false);
        }
        self.save(&routines)?;
        Ok(true)
    }

    /// Overwrite the stored list with the samples.
    pub fn reset_defaults(&self) -> Result<Vec<RoutineDefinition>, StorageError> {
        let routines = default_routines();
        self.save(&routines)?;
        Ok(routines)
    }

    /// Validate a draft and write it back.
    ///
    /// # Errors
    /// Returns a validation error (nothing is written) if the draft is
    /// invalid, or a storage error if the write fails.
    pub fn save_draft(&self, draft: &RoutineDraft) -> Result<RoutineDefinition, CoreError> {
        let routines = self.load()?;
        let existing = match draft.id.as_deref() {
            Some(id) => Some(
                routines
                    .iter()
                    .find(|r| r.id == id)
                    .ok_or_else(|| ValidationError::NotFound(id.to_string()))?,
            ),
            None => None,
        };
        let routine = draft.build(existing)?;
        self.upsert(routine.clone())?;
        Ok(routine)
    }
}

fn parse_document(raw: &str) -> Result<Vec<RoutineDefinition>, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(items) => items.into_iter().map(migrations::normalize).collect(),
        other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
            "routine document must be an array, got {other}"
        ))),
    }
}
