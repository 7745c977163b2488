//! Flat string catalog for the strings the session surfaces.
//!
//! Lookup falls back to English, then to the key itself. `{name}`
//! placeholders are substituted from the supplied variables.

use crate::error::SessionError;
use crate::routine::{ExhaleRoute, RoutineDefinition, StepKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    /// Parse a language code, falling back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Language::Es,
            _ => Language::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }
}

const EN: &[(&str, &str)] = &[
    ("inhale", "Inhale"),
    ("exhale", "Exhale"),
    ("hold", "Hold"),
    ("nose", "nose"),
    ("mouth", "mouth"),
    ("rest", "Rest"),
    ("sessionComplete", "Session complete"),
    ("noRoutineSelected", "No routine selected"),
    ("emptyRoutine", "This routine has no steps"),
    ("alreadyCompleted", "Session already complete, reset to start again"),
    ("routineMeta", "{scenario} routine"),
    ("totalCount", "{count} total"),
    ("cyclesCount", "{count} cycles"),
    ("repsTag", "x{count} reps"),
    ("cycleOf", "Cycle {current}/{total}"),
    ("repOf", "Rep {current}/{total}"),
    ("routineNameBoxFocus", "Box Focus"),
    ("routineNameEnergizeBox", "Energize Box"),
    ("routineNameSleep478", "Sleep 4-7-8"),
    ("routineNameWindDown478", "Wind Down 4-7-8"),
    ("routineNameAnxietyCalm", "Anxiety 5-5 Calm"),
    ("routineNameExerciseRecovery", "Exercise Recovery (Pursed Lip)"),
    ("scenarioAwake", "awake"),
    ("scenarioEnergize", "energize"),
    ("scenarioFallAsleep", "fall asleep"),
    ("scenarioWindDown", "wind down"),
    ("scenarioAnxiety", "anxiety"),
    ("scenarioExercise", "exercise"),
];

const ES: &[(&str, &str)] = &[
    ("inhale", "Inhalar"),
    ("exhale", "Exhalar"),
    ("hold", "Mantener"),
    ("nose", "nariz"),
    ("mouth", "boca"),
    ("rest", "Descanso"),
    ("sessionComplete", "Sesión completa"),
    ("noRoutineSelected", "Ninguna rutina seleccionada"),
    ("emptyRoutine", "Esta rutina no tiene pasos"),
    ("alreadyCompleted", "La sesión ya terminó, reinicia para empezar de nuevo"),
    ("routineMeta", "Rutina de {scenario}"),
    ("totalCount", "{count} en total"),
    ("cyclesCount", "{count} ciclos"),
    ("repsTag", "x{count} repeticiones"),
    ("cycleOf", "Ciclo {current}/{total}"),
    ("repOf", "Rep {current}/{total}"),
    ("routineNameBoxFocus", "Enfoque en caja"),
    ("routineNameEnergizeBox", "Energía en caja"),
    ("routineNameSleep478", "Dormir 4-7-8"),
    ("routineNameWindDown478", "Relajación 4-7-8"),
    ("routineNameAnxietyCalm", "Calma 5-5"),
    ("routineNameExerciseRecovery", "Recuperación (labios fruncidos)"),
    ("scenarioAwake", "despierto"),
    ("scenarioEnergize", "energía"),
    ("scenarioFallAsleep", "dormir"),
    ("scenarioWindDown", "relajación"),
    ("scenarioAnxiety", "ansiedad"),
    ("scenarioExercise", "ejercicio"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog {
    language: Language,
}

impl Catalog {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    fn table(&self) -> &'static [(&'static str, &'static str)] {
        match self.language {
            Language::En => EN,
            Language::Es => ES,
        }
    }

    fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
        table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Translate `key`, substituting `{name}` placeholders.
    pub fn t(&self, key: &str, vars: &[(&str, &str)]) -> String {
        let mut text = Self::lookup(self.table(), key)
            .or_else(|| Self::lookup(EN, key))
            .unwrap_or(key)
            .to_string();
        for (name, value) in vars {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }

    /// "Inhale", "Hold", or "Exhale (mouth)".
    pub fn step_label(&self, kind: StepKind, route: Option<ExhaleRoute>) -> String {
        match (kind, route) {
            (StepKind::Exhale, Some(route)) => {
                format!("{} ({})", self.t("exhale", &[]), self.t(route.as_str(), &[]))
            }
            _ => self.t(kind.as_str(), &[]),
        }
    }

    /// Status text for a refused start.
    pub fn start_rejected(&self, reason: SessionError) -> String {
        let key = match reason {
            SessionError::NoRoutineSelected => "noRoutineSelected",
            SessionError::EmptyRoutine => "emptyRoutine",
            SessionError::AlreadyCompleted => "alreadyCompleted",
        };
        self.t(key, &[])
    }

    pub fn routine_name(&self, routine: &RoutineDefinition) -> String {
        match &routine.name_key {
            Some(key) => self.t(key, &[]),
            None => routine.display_name.clone(),
        }
    }

    pub fn routine_scenario(&self, routine: &RoutineDefinition) -> String {
        match &routine.scenario_key {
            Some(key) => self.t(key, &[]),
            None => routine.scenario_label.clone(),
        }
    }
}
