use clap::Subcommand;
use respira_core::routine::{CycleDraft, RoutineDraft};
use respira_core::{Config, RoutineStore, ValidationError};

use crate::common::{catalog, cycle_line, format_seconds, routine_tags};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// List all routines
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one routine
    Show {
        /// Routine ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a routine
    Create {
        /// Routine name
        name: String,
        /// Scenario (e.g. "anxiety", "fall asleep")
        #[arg(long)]
        scenario: String,
        /// Category; derived from the scenario when omitted
        #[arg(long)]
        category: Option<String>,
        /// Cycle as REPS:kind=secs,... (e.g. "4:inhale=4,hold=7,exhale=8/mouth"); repeatable
        #[arg(long = "cycle", required = true)]
        cycles: Vec<CycleDraft>,
    },
    /// Edit a routine; omitted options keep their current value
    Edit {
        /// Routine ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        scenario: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Replacement cycles; repeatable
        #[arg(long = "cycle")]
        cycles: Vec<CycleDraft>,
    },
    /// Delete a routine
    Delete {
        /// Routine ID
        id: String,
    },
    /// Restore the sample routines, discarding custom ones
    ResetSamples,
}

pub fn run(action: RoutineAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = RoutineStore::open()?;
    let catalog = catalog(&Config::load_or_default());

    match action {
        RoutineAction::List { json } => {
            let routines = store.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&routines)?);
                return Ok(());
            }
            for routine in &routines {
                println!("{} [{}]", catalog.routine_name(routine), routine.id);
                println!("  {}", routine_tags(&catalog, routine));
            }
            println!(
                "{}",
                catalog.t("totalCount", &[("count", &routines.len().to_string())])
            );
        }
        RoutineAction::Show { id, json } => {
            let routine = store
                .get(&id)?
                .ok_or_else(|| ValidationError::NotFound(id.clone()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&routine)?);
                return Ok(());
            }
            println!("{} [{}]", catalog.routine_name(&routine), routine.id);
            println!("  {}", routine_tags(&catalog, &routine));
            for (i, cycle) in routine.cycles.iter().enumerate() {
                println!("  {}", cycle_line(&catalog, i, cycle));
            }
            println!("  Total: {}", format_seconds(routine.total_seconds()));
        }
        RoutineAction::Create {
            name,
            scenario,
            category,
            cycles,
        } => {
            let draft = RoutineDraft {
                id: None,
                name,
                scenario,
                category,
                cycles,
            };
            let routine = store.save_draft(&draft)?;
            println!("Routine created: {}", routine.id);
            println!("{}", serde_json::to_string_pretty(&routine)?);
        }
        RoutineAction::Edit {
            id,
            name,
            scenario,
            category,
            cycles,
        } => {
            let existing = store
                .get(&id)?
                .ok_or_else(|| ValidationError::NotFound(id.clone()))?;
            let mut draft = RoutineDraft::from_routine(&existing);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(scenario) = scenario {
                draft.scenario = scenario;
                if category.is_none() {
                    draft.category = None;
                }
            }
            if category.is_some() {
                draft.category = category;
            }
            if !cycles.is_empty() {
                draft.cycles = cycles;
            }
            let routine = store.save_draft(&draft)?;
            println!("Routine updated:");
            println!("{}", serde_json::to_string_pretty(&routine)?);
        }
        RoutineAction::Delete { id } => {
            if !store.delete(&id)? {
                return Err(ValidationError::NotFound(id).into());
            }
            println!("Routine deleted: {id}");
        }
        RoutineAction::ResetSamples => {
            let routines = store.reset_defaults()?;
            println!("restored {} sample routines", routines.len());
        }
    }
    Ok(())
}
