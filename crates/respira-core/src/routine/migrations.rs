//! Shape migrations for persisted routines.
//!
//! Routines are stored as loosely-typed JSON. Older documents used a flat
//! `steps` list with a single top-level `repetitions`; the current shape nests
//! steps inside `cycles`. Migrations are applied in order on the raw value,
//! after which the typed routine is sanitized so the session clock never sees
//! a zero repetition count or a non-positive duration.
//!
//! ```text
//! v1: { steps: [..], repetitions: n }
//! v2: { cycles: [{ repetitions: n, steps: [..] }, ..] }
//! ```

use serde::de::Error as _;
use serde_json::{json, Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::{category_for_scenario, ExhaleRoute, RoutineDefinition, StepKind, MIN_STEP_SECONDS};

/// Current routine shape version.
pub const CURRENT_SHAPE_VERSION: u32 = 2;

/// Steps per synthesized cycle when splitting a v1 flat list.
const LEGACY_CHUNK: usize = 3;

/// Repetitions given to the placeholder cycle of a routine with no cycles.
const PLACEHOLDER_REPETITIONS: u32 = 4;

/// Detect the shape version of a raw routine object.
pub fn shape_version(raw: &Map<String, Value>) -> u32 {
    match raw.get("cycles") {
        Some(Value::Array(_)) => 2,
        _ => 1,
    }
}

/// Normalize one raw persisted routine into the current shape.
///
/// # Errors
/// Returns an error if the value is not an object or a step has an
/// unrecognized type.
pub fn normalize(raw: Value) -> Result<RoutineDefinition, serde_json::Error> {
    let mut obj = match raw {
        Value::Object(map) => map,
        other => {
            return Err(serde_json::Error::custom(format!(
                "routine must be an object, got {other}"
            )))
        }
    };

    if shape_version(&obj) < 2 {
        migrate_v2(&mut obj);
    }
    obj.remove("steps");
    obj.remove("repetitions");

    fill_defaults(&mut obj);

    let mut routine: RoutineDefinition = serde_json::from_value(Value::Object(obj))?;
    sanitize(&mut routine);
    Ok(routine)
}

/// v1 -> v2: chunk the flat step list into cycles of three, each carrying the
/// routine-level repetition count.
fn migrate_v2(obj: &mut Map<String, Value>) {
    let steps = match obj.get("steps") {
        Some(Value::Array(steps)) => steps.clone(),
        _ => Vec::new(),
    };
    let repetitions = obj.get("repetitions").map(coerce_repetitions).unwrap_or(1);

    let cycles: Vec<Value> = steps
        .chunks(LEGACY_CHUNK)
        .map(|chunk| json!({ "repetitions": repetitions, "steps": chunk }))
        .collect();
    obj.insert("cycles".into(), Value::Array(cycles));
}

fn fill_defaults(obj: &mut Map<String, Value>) {
    let has_id = matches!(obj.get("id"), Some(Value::String(id)) if !id.trim().is_empty());
    if !has_id {
        obj.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    if !matches!(obj.get("name"), Some(Value::String(_))) {
        obj.insert("name".into(), Value::String(String::new()));
    }

    let empty = match obj.get("cycles") {
        Some(Value::Array(cycles)) => cycles.is_empty(),
        _ => true,
    };
    if empty {
        obj.insert(
            "cycles".into(),
            json!([{ "repetitions": PLACEHOLDER_REPETITIONS, "steps": [] }]),
        );
    }

    if let Some(Value::Array(cycles)) = obj.get_mut("cycles") {
        for cycle in cycles.iter_mut().filter_map(Value::as_object_mut) {
            let repetitions = cycle.get("repetitions").map(coerce_repetitions).unwrap_or(1);
            cycle.insert("repetitions".into(), json!(repetitions));

            if let Some(Value::Array(steps)) = cycle.get_mut("steps") {
                for step in steps.iter_mut().filter_map(Value::as_object_mut) {
                    let duration = step
                        .get("duration")
                        .and_then(as_number)
                        .filter(|d| d.is_finite())
                        .unwrap_or_else(|| {
                            warn!(value = ?step.get("duration"), "unreadable step duration replaced");
                            MIN_STEP_SECONDS
                        });
                    step.insert("duration".into(), json!(duration));
                }
            }
        }
    }
}

/// Numbers, or strings holding a number.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

/// Floor a raw repetition count at 1. Non-numbers count as 1.
fn coerce_repetitions(value: &Value) -> u32 {
    match as_number(value).filter(|n| n.is_finite()) {
        Some(n) => n.max(1.0).min(u32::MAX as f64) as u32,
        None => {
            warn!(?value, "unreadable repetition count replaced");
            1
        }
    }
}

fn sanitize(routine: &mut RoutineDefinition) {
    if routine.category.trim().is_empty() {
        routine.category = category_for_scenario(&routine.scenario_label).into();
    }
    for cycle in &mut routine.cycles {
        cycle.repetitions = cycle.repetitions.max(1);
        for step in &mut cycle.steps {
            if !step.duration_seconds.is_finite() || step.duration_seconds < MIN_STEP_SECONDS {
                step.duration_seconds = MIN_STEP_SECONDS;
            }
            step.exhale_route = match step.kind {
                StepKind::Exhale => Some(step.exhale_route.unwrap_or(ExhaleRoute::Nose)),
                _ => None,
            };
        }
    }
}
