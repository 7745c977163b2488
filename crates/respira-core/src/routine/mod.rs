//! Routine definitions: the immutable input of a breathing session.
//!
//! A routine is an ordered list of cycles; a cycle repeats its ordered list of
//! steps `repetitions` times. The serialized field names match the persisted
//! document (`name`, `scenario`, `type`, `duration`, `exhaleVia`).

pub mod builder;
pub mod migrations;

use serde::{Deserialize, Serialize};

pub use builder::{CycleDraft, RoutineDraft, StepDraft};
pub use migrations::normalize;

/// Shortest step accepted at data-entry time, in seconds.
pub const MIN_STEP_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Inhale,
    Hold,
    Exhale,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Inhale => "inhale",
            StepKind::Hold => "hold",
            StepKind::Exhale => "exhale",
        }
    }
}

impl std::str::FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inhale" | "in" => Ok(StepKind::Inhale),
            "hold" => Ok(StepKind::Hold),
            "exhale" | "out" => Ok(StepKind::Exhale),
            other => Err(format!("unknown step type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaleRoute {
    #[default]
    Nose,
    Mouth,
}

impl ExhaleRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExhaleRoute::Nose => "nose",
            ExhaleRoute::Mouth => "mouth",
        }
    }
}

impl std::str::FromStr for ExhaleRoute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nose" => Ok(ExhaleRoute::Nose),
            "mouth" => Ok(ExhaleRoute::Mouth),
            other => Err(format!("unknown exhale route '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Duration in seconds.
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    /// Only set for exhale steps.
    #[serde(rename = "exhaleVia", default, skip_serializing_if = "Option::is_none")]
    pub exhale_route: Option<ExhaleRoute>,
}

impl StepDefinition {
    pub fn inhale(duration_seconds: f64) -> Self {
        Self {
            kind: StepKind::Inhale,
            duration_seconds,
            exhale_route: None,
        }
    }

    pub fn hold(duration_seconds: f64) -> Self {
        Self {
            kind: StepKind::Hold,
            duration_seconds,
            exhale_route: None,
        }
    }

    pub fn exhale(duration_seconds: f64, route: ExhaleRoute) -> Self {
        Self {
            kind: StepKind::Exhale,
            duration_seconds,
            exhale_route: Some(route),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleDefinition {
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl CycleDefinition {
    pub fn new(repetitions: u32, steps: Vec<StepDefinition>) -> Self {
        Self {
            repetitions: repetitions.max(1),
            steps,
        }
    }

    /// Repetition count floored at 1.
    pub fn effective_repetitions(&self) -> u32 {
        self.repetitions.max(1)
    }

    /// Seconds for one pass through the steps.
    pub fn pass_seconds(&self) -> f64 {
        self.steps.iter().map(|s| s.duration_seconds.max(0.0)).sum()
    }
}

fn default_repetitions() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineDefinition {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    /// Catalog key that localizes `display_name` for built-in presets.
    #[serde(rename = "nameKey", default, skip_serializing_if = "Option::is_none")]
    pub name_key: Option<String>,
    #[serde(rename = "scenario", default)]
    pub scenario_label: String,
    #[serde(rename = "scenarioKey", default, skip_serializing_if = "Option::is_none")]
    pub scenario_key: Option<String>,
    #[serde(default)]
    pub category: String,
    pub cycles: Vec<CycleDefinition>,
}

impl RoutineDefinition {
    /// Cycles that can actually be played (at least one step).
    pub fn playable_cycles(&self) -> impl Iterator<Item = &CycleDefinition> {
        self.cycles.iter().filter(|c| !c.steps.is_empty())
    }

    pub fn is_playable(&self) -> bool {
        self.playable_cycles().next().is_some()
    }

    /// Sum of every step across all repetitions, excluding transition rests.
    pub fn total_seconds(&self) -> f64 {
        self.playable_cycles()
            .map(|c| c.pass_seconds() * c.effective_repetitions() as f64)
            .sum()
    }
}

/// Category bucket for a scenario label.
pub fn category_for_scenario(scenario: &str) -> &'static str {
    match scenario.trim().to_ascii_lowercase().as_str() {
        "awake" | "energize" => "energy",
        "fall asleep" | "wind down" => "sleep",
        "anxiety" => "calm",
        "exercise" => "recovery",
        _ => "custom",
    }
}

fn preset(
    id: &str,
    name: &str,
    name_key: &str,
    scenario: &str,
    scenario_key: &str,
    cycles: Vec<CycleDefinition>,
) -> RoutineDefinition {
    RoutineDefinition {
        id: id.into(),
        display_name: name.into(),
        name_key: Some(name_key.into()),
        scenario_label: scenario.into(),
        scenario_key: Some(scenario_key.into()),
        category: category_for_scenario(scenario).into(),
        cycles,
    }
}

fn box_cycle() -> CycleDefinition {
    CycleDefinition::new(
        4,
        vec![
            StepDefinition::inhale(4.0),
            StepDefinition::hold(4.0),
            StepDefinition::exhale(4.0, ExhaleRoute::Mouth),
            StepDefinition::hold(4.0),
        ],
    )
}

fn four_seven_eight_cycle() -> CycleDefinition {
    CycleDefinition::new(
        4,
        vec![
            StepDefinition::inhale(4.0),
            StepDefinition::hold(7.0),
            StepDefinition::exhale(8.0, ExhaleRoute::Mouth),
        ],
    )
}

/// The built-in sample routines, seeded on first run and on "reset samples".
pub fn default_routines() -> Vec<RoutineDefinition> {
    vec![
        preset(
            "box-focus",
            "Box Focus",
            "routineNameBoxFocus",
            "awake",
            "scenarioAwake",
            vec![box_cycle()],
        ),
        preset(
            "energize-box",
            "Energize Box",
            "routineNameEnergizeBox",
            "energize",
            "scenarioEnergize",
            vec![box_cycle()],
        ),
        preset(
            "sleep-478",
            "Sleep 4-7-8",
            "routineNameSleep478",
            "fall asleep",
            "scenarioFallAsleep",
            vec![four_seven_eight_cycle()],
        ),
        preset(
            "wind-down-478",
            "Wind Down 4-7-8",
            "routineNameWindDown478",
            "wind down",
            "scenarioWindDown",
            vec![four_seven_eight_cycle()],
        ),
        preset(
            "anxiety-calm",
            "Anxiety 5-5 Calm",
            "routineNameAnxietyCalm",
            "anxiety",
            "scenarioAnxiety",
            vec![CycleDefinition::new(
                6,
                vec![
                    StepDefinition::inhale(5.0),
                    StepDefinition::exhale(5.0, ExhaleRoute::Mouth),
                ],
            )],
        ),
        preset(
            "exercise-recovery",
            "Exercise Recovery (Pursed Lip)",
            "routineNameExerciseRecovery",
            "exercise",
            "scenarioExercise",
            vec![CycleDefinition::new(
                6,
                vec![
                    StepDefinition::inhale(2.0),
                    StepDefinition::exhale(4.0, ExhaleRoute::Mouth),
                ],
            )],
        ),
    ]
}
