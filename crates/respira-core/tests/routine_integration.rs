//! Integration tests for routine persistence and editing.
//!
//! These verify the complete workflow of seeding, migrating, editing and
//! reloading routines through an on-disk database.

use respira_core::routine::{CycleDraft, RoutineDraft, StepDraft};
use respira_core::storage::{Database, RoutineStore, ROUTINES_KEY};
use respira_core::{default_routines, CoreError, ExhaleRoute, StepKind, ValidationError};
use serde_json::json;
use tempfile::TempDir;

fn open(dir: &TempDir) -> RoutineStore {
    RoutineStore::new(Database::open_at(&dir.path().join("respira.db")).unwrap())
}

fn draft(name: &str) -> RoutineDraft {
    RoutineDraft {
        id: None,
        name: name.into(),
        scenario: "anxiety".into(),
        category: None,
        cycles: vec![
            CycleDraft {
                repetitions: 0,
                steps: vec![],
            },
            "3:inhale=4,hold=2,exhale=6/mouth".parse().unwrap(),
        ],
    }
}

#[test]
fn test_created_routine_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let created = {
        let store = open(&dir);
        store.save_draft(&draft("  Evening calm  ")).unwrap()
    };

    let store = open(&dir);
    let routines = store.load().unwrap();
    assert_eq!(routines.len(), default_routines().len() + 1);
    let loaded = store.get(&created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.display_name, "Evening calm");
    assert_eq!(loaded.category, "calm");
    assert_eq!(loaded.cycles.len(), 1);
    assert_eq!(loaded.cycles[0].repetitions, 3);
    assert_eq!(loaded.cycles[0].steps[2].exhale_route, Some(ExhaleRoute::Mouth));
}

#[test]
fn test_rejected_draft_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let before = store.load().unwrap();

    let mut empty = draft("Empty");
    empty.cycles.truncate(1);
    let err = store.save_draft(&empty).unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::EmptyRoutine)));
    assert_eq!(empty.cycles.len(), 1);
    assert_eq!(store.load().unwrap(), before);

    let mut unknown = draft("Ghost");
    unknown.id = Some("missing".into());
    assert!(matches!(
        store.save_draft(&unknown),
        Err(CoreError::Validation(ValidationError::NotFound(_)))
    ));
}

#[test]
fn test_editing_preset_keeps_catalog_keys_until_renamed() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let preset = store.get("sleep-478").unwrap().unwrap();

    let mut edit = RoutineDraft::from_routine(&preset);
    edit.cycles[0].repetitions = 8;
    let saved = store.save_draft(&edit).unwrap();
    assert_eq!(saved.name_key, preset.name_key);
    assert_eq!(saved.cycles[0].repetitions, 8);

    edit.name = "My sleep".into();
    let renamed = store.save_draft(&edit).unwrap();
    assert_eq!(renamed.name_key, None);
    assert_eq!(renamed.scenario_key, preset.scenario_key);
    assert_eq!(store.load().unwrap().len(), default_routines().len());
}

#[test]
fn test_legacy_document_migrates_on_load() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let step = |kind: &str, duration: f64| json!({ "type": kind, "duration": duration });
    let document = json!([
        {
            "id": "legacy",
            "name": "Legacy",
            "scenario": "exercise",
            "repetitions": 3,
            "steps": [
                step("inhale", 4.0), step("hold", 4.0), step("exhale", 4.0),
                step("inhale", 2.0), step("hold", 0.0), step("exhale", 6.0)
            ]
        },
        { "name": "No id, no steps" }
    ]);
    store
        .database()
        .kv_set(ROUTINES_KEY, &document.to_string())
        .unwrap();

    let routines = store.load().unwrap();
    assert_eq!(routines.len(), 2);

    let legacy = &routines[0];
    assert_eq!(legacy.category, "recovery");
    assert_eq!(legacy.cycles.len(), 2);
    for cycle in &legacy.cycles {
        assert_eq!(cycle.repetitions, 3);
        assert_eq!(cycle.steps.len(), 3);
    }
    assert_eq!(legacy.cycles[1].steps[1].duration_seconds, 1.0);
    assert_eq!(legacy.cycles[0].steps[2].exhale_route, Some(ExhaleRoute::Nose));
    assert_eq!(legacy.cycles[0].steps[0].kind, StepKind::Inhale);

    let empty = &routines[1];
    assert!(!empty.id.is_empty());
    assert!(!empty.is_playable());
}

#[test]
fn test_delete_and_reset_samples() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.load().unwrap();
    assert!(store.delete("box-focus").unwrap());
    assert!(!store.delete("box-focus").unwrap());
    assert!(store.get("box-focus").unwrap().is_none());

    store.reset_defaults().unwrap();
    assert_eq!(open(&dir).load().unwrap(), default_routines());
}

#[test]
fn test_corrupt_document_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.database().kv_set(ROUTINES_KEY, "[{").unwrap();
    assert_eq!(store.load().unwrap(), default_routines());
    assert_eq!(
        store.database().kv_get(ROUTINES_KEY).unwrap().as_deref(),
        Some("[{")
    );
}
