use clap::Subcommand;
use respira_core::session::{frame_period, scheduler, SessionController, Update};
use respira_core::{Catalog, Config, Event, RoutineDefinition, RoutineStore, ValidationError};
use serde_json::json;
use tracing::debug;

use crate::common::{catalog, format_seconds};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Play a routine in real time, printing each phase as it begins
    Play {
        /// Routine ID
        id: String,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Run a routine on a simulated clock and print the timeline
    Simulate {
        /// Routine ID
        id: String,
        /// Simulated time between frames, in milliseconds
        #[arg(long, default_value = "100")]
        delta_ms: u64,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let catalog = catalog(&config);
    let store = RoutineStore::open()?;

    match action {
        SessionAction::Play { id, json } => {
            let routine = find(&store, &id)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(play(&config, &catalog, routine, json))
        }
        SessionAction::Simulate { id, delta_ms, json } => {
            let routine = find(&store, &id)?;
            simulate(&config, &catalog, routine, delta_ms.max(1), json)
        }
    }
}

fn find(store: &RoutineStore, id: &str) -> Result<RoutineDefinition, Box<dyn std::error::Error>> {
    Ok(store
        .get(id)?
        .ok_or_else(|| ValidationError::NotFound(id.to_string()))?)
}

/// Renders session events for the terminal.
struct Printer<'a> {
    catalog: &'a Catalog,
    cycle_count: usize,
    json: bool,
}

impl<'a> Printer<'a> {
    fn new(catalog: &'a Catalog, routine: &RoutineDefinition, json: bool) -> Self {
        Self {
            catalog,
            cycle_count: routine.playable_cycles().count(),
            json,
        }
    }

    fn title(&self, routine: &RoutineDefinition) {
        if !self.json {
            println!("{}", self.catalog.routine_name(routine));
        }
    }

    fn event(&self, event: &Event, elapsed: f64) {
        if self.json {
            println!("{}", json!({ "t": elapsed, "event": event }));
            return;
        }
        let stamp = format!("[{elapsed:>7.1}s]");
        match event {
            Event::PhaseChanged {
                phase,
                exhale_route,
                cycle_index,
                repetition,
                repetitions,
                ..
            } => {
                let mut place = self.catalog.t(
                    "cycleOf",
                    &[
                        ("current", &(cycle_index + 1).to_string()),
                        ("total", &self.cycle_count.to_string()),
                    ],
                );
                if *repetitions > 1 {
                    let rep = self.catalog.t(
                        "repOf",
                        &[
                            ("current", &repetition.to_string()),
                            ("total", &repetitions.to_string()),
                        ],
                    );
                    place = format!("{place} · {rep}");
                }
                println!(
                    "{stamp} {place} · {}",
                    self.catalog.step_label(*phase, *exhale_route)
                );
            }
            Event::TransitionStarted { .. } => {
                println!("{stamp} {}", self.catalog.t("rest", &[]))
            }
            Event::SessionCompleted { .. } => println!(
                "{stamp} {} ({})",
                self.catalog.t("sessionComplete", &[]),
                format_seconds(elapsed)
            ),
            _ => {}
        }
    }
}

async fn play(
    config: &Config,
    catalog: &Catalog,
    routine: RoutineDefinition,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let printer = Printer::new(catalog, &routine, json);
    printer.title(&routine);
    let period = frame_period(config.session.frame_rate);
    debug!(routine = %routine.id, ?period, "playing session");
    let controller = SessionController::from_config(config);
    let (handle, mut updates, task) =
        scheduler::spawn(controller, period);

    handle.select(routine).await?;
    handle.start().await?;

    let started = tokio::time::Instant::now();
    let mut outcome: Result<(), Box<dyn std::error::Error>> = Ok(());
    while let Some(update) = updates.recv().await {
        let Update::Event(event) = update else {
            continue;
        };
        if let Event::StartRejected { reason, .. } = event {
            outcome = Err(catalog.start_rejected(reason).into());
            break;
        }
        printer.event(&event, started.elapsed().as_secs_f64());
        if matches!(event, Event::SessionCompleted { .. }) {
            break;
        }
    }

    handle.shutdown().await?;
    task.await?;
    outcome
}

fn simulate(
    config: &Config,
    catalog: &Catalog,
    routine: RoutineDefinition,
    delta_ms: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let delta = delta_ms as f64 / 1000.0;
    debug!(routine = %routine.id, delta, "simulating session");
    let printer = Printer::new(catalog, &routine, json);
    printer.title(&routine);
    let mut controller = SessionController::from_config(config);
    controller.select(routine);

    match controller.start() {
        Some(Event::StartRejected { reason, .. }) => {
            return Err(catalog.start_rejected(reason).into())
        }
        Some(event) => printer.event(&event, 0.0),
        None => {}
    }

    // First frame has no delta, like a real frame loop.
    let mut elapsed = 0.0;
    let mut step = 0.0;
    while let Some(update) = controller.advance(step) {
        elapsed += step;
        step = delta;
        for event in &update.events {
            printer.event(event, elapsed);
        }
    }
    Ok(())
}
