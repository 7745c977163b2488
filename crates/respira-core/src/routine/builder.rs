//! Routine builder: turns user-authored drafts into validated routines.
//!
//! Drafts are loose (any repetition count, any duration, routes on any step).
//! `build` applies the data-entry rules so the session clock can trust its
//! input, and rejects drafts with nothing to play. The draft is only borrowed,
//! so a rejected save leaves the user's input untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    category_for_scenario, CycleDefinition, ExhaleRoute, RoutineDefinition, StepDefinition,
    StepKind, MIN_STEP_SECONDS,
};
use crate::error::ValidationError;

/// Limits applied when building a routine.
pub mod constraints {
    /// Maximum length of a routine name or scenario.
    pub const MAX_LABEL_LENGTH: usize = 100;
    /// Maximum repetitions of one cycle.
    pub const MAX_REPETITIONS: u32 = 100;
    /// Maximum seconds for one step.
    pub const MAX_STEP_SECONDS: f64 = 600.0;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDraft {
    pub kind: StepKind,
    pub duration_seconds: f64,
    #[serde(default)]
    pub exhale_route: Option<ExhaleRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleDraft {
    pub repetitions: i64,
    pub steps: Vec<StepDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutineDraft {
    /// Id of the routine being edited; `None` for a new routine.
    pub id: Option<String>,
    pub name: String,
    pub scenario: String,
    #[serde(default)]
    pub category: Option<String>,
    pub cycles: Vec<CycleDraft>,
}

impl RoutineDraft {
    /// Draft pre-filled from an existing routine, for editing.
    pub fn from_routine(routine: &RoutineDefinition) -> Self {
        Self {
            id: Some(routine.id.clone()),
            name: routine.display_name.clone(),
            scenario: routine.scenario_label.clone(),
            category: Some(routine.category.clone()),
            cycles: routine
                .cycles
                .iter()
                .map(|c| CycleDraft {
                    repetitions: c.repetitions as i64,
                    steps: c
                        .steps
                        .iter()
                        .map(|s| StepDraft {
                            kind: s.kind,
                            duration_seconds: s.duration_seconds,
                            exhale_route: s.exhale_route,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Build a validated routine from this draft.
    ///
    /// `existing` is the stored routine with the same id, if any. Its catalog
    /// keys survive when the edited name/scenario text is unchanged.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidValue` for a blank or overlong name or
    /// scenario, and `ValidationError::EmptyRoutine` when no cycle has a step.
    pub fn build(
        &self,
        existing: Option<&RoutineDefinition>,
    ) -> Result<RoutineDefinition, ValidationError> {
        let name = required_label("name", &self.name)?;
        let scenario = required_label("scenario", &self.scenario)?;

        let cycles: Vec<CycleDefinition> = self
            .cycles
            .iter()
            .filter(|c| !c.steps.is_empty())
            .map(build_cycle)
            .collect();
        if cycles.is_empty() {
            return Err(ValidationError::EmptyRoutine);
        }

        let existing = existing.filter(|e| Some(&e.id) == self.id.as_ref());
        let name_key = existing
            .filter(|e| e.display_name == name)
            .and_then(|e| e.name_key.clone());
        let scenario_key = existing
            .filter(|e| e.scenario_label == scenario)
            .and_then(|e| e.scenario_key.clone());

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| category_for_scenario(&scenario).to_string());

        Ok(RoutineDefinition {
            id: self
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            display_name: name,
            name_key,
            scenario_label: scenario,
            scenario_key,
            category,
            cycles,
        })
    }
}

fn required_label(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.into(),
            message: "must not be empty".into(),
        });
    }
    if trimmed.chars().count() > constraints::MAX_LABEL_LENGTH {
        return Err(ValidationError::InvalidValue {
            field: field.into(),
            message: format!("must be at most {} characters", constraints::MAX_LABEL_LENGTH),
        });
    }
    Ok(trimmed.to_string())
}

fn build_cycle(draft: &CycleDraft) -> CycleDefinition {
    let repetitions = draft.repetitions.clamp(1, constraints::MAX_REPETITIONS as i64) as u32;
    CycleDefinition::new(repetitions, draft.steps.iter().map(build_step).collect())
}

fn build_step(draft: &StepDraft) -> StepDefinition {
    let duration_seconds = if draft.duration_seconds.is_finite() {
        draft
            .duration_seconds
            .clamp(MIN_STEP_SECONDS, constraints::MAX_STEP_SECONDS)
    } else {
        MIN_STEP_SECONDS
    };
    StepDefinition {
        kind: draft.kind,
        duration_seconds,
        exhale_route: match draft.kind {
            StepKind::Exhale => Some(draft.exhale_route.unwrap_or_default()),
            _ => None,
        },
    }
}

/// Parse a compact cycle description: `REPS:STEP,STEP,...` where each step is
/// `kind=seconds` and exhale steps may add `/nose` or `/mouth`.
///
/// ```text
/// 4:inhale=4,hold=7,exhale=8/mouth
/// ```
impl std::str::FromStr for CycleDraft {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (reps, steps) = s
            .split_once(':')
            .ok_or_else(|| format!("expected REPS:STEPS, got '{s}'"))?;
        let repetitions = reps
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid repetitions '{}'", reps.trim()))?;

        let steps = steps
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(parse_step)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CycleDraft { repetitions, steps })
    }
}

fn parse_step(part: &str) -> Result<StepDraft, String> {
    let (kind, rest) = part
        .split_once('=')
        .ok_or_else(|| format!("expected kind=seconds, got '{}'", part.trim()))?;
    let kind: StepKind = kind.parse()?;
    let (seconds, route) = match rest.split_once('/') {
        Some((seconds, route)) => (seconds, Some(route.parse::<ExhaleRoute>()?)),
        None => (rest, None),
    };
    let duration_seconds = seconds
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid seconds '{}'", seconds.trim()))?;
    Ok(StepDraft {
        kind,
        duration_seconds,
        exhale_route: route,
    })
}
