//! Diagnostic logging to stderr.
//!
//! Filter comes from `RESPIRA_LOG` (same syntax as `RUST_LOG`), defaulting to
//! `warn` so normal command output stays clean.
//!
//! ```bash
//! RESPIRA_LOG=respira_core=debug respira session simulate box-focus
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "RESPIRA_LOG";

pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
