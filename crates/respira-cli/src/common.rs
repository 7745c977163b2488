//! Shared formatting for command output.

use respira_core::routine::CycleDefinition;
use respira_core::{Catalog, Config, Language, RoutineDefinition};

/// Catalog in the configured language.
pub fn catalog(config: &Config) -> Catalog {
    Catalog::new(Language::from_code(&config.ui.language))
}

/// `45s`, `1m 04s`, `12m 00s`.
pub fn format_seconds(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    if total < 60 {
        format!("{total}s")
    } else {
        format!("{}m {:02}s", total / 60, total % 60)
    }
}

/// One line: scenario, category, cycle and repetition tags.
pub fn routine_tags(catalog: &Catalog, routine: &RoutineDefinition) -> String {
    let mut tags = vec![
        catalog.routine_scenario(routine),
        routine.category.clone(),
        catalog.t("cyclesCount", &[("count", &routine.cycles.len().to_string())]),
    ];
    tags.extend(
        routine
            .cycles
            .iter()
            .map(|c| catalog.t("repsTag", &[("count", &c.repetitions.to_string())])),
    );
    tags.join(" · ")
}

/// `Cycle 1 x4: Inhale 4s, Hold 7s, Exhale (mouth) 8s`
pub fn cycle_line(catalog: &Catalog, index: usize, cycle: &CycleDefinition) -> String {
    let steps: Vec<String> = cycle
        .steps
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                catalog.step_label(s.kind, s.exhale_route),
                format_seconds(s.duration_seconds)
            )
        })
        .collect();
    let steps = if steps.is_empty() {
        "-".to_string()
    } else {
        steps.join(", ")
    };
    format!("Cycle {} x{}: {steps}", index + 1, cycle.repetitions)
}
