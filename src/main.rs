//! Batch entry point: dispatches the calls on the command line into the
//! sample catalog and exits with 0 when every call succeeded.
//!
//! ```text
//! invoker [host options] [-invokeLog <path>] -invoke <call> [-next <call>]*
//! ```

use std::process::ExitCode;

use invoker::chain::{self, EXIT_FAILURE};
use invoker::executor::Invoker;
use invoker::samples::sample_catalog;
use invoker::settings::Settings;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            init_logging("info");
            error!(error = %e, "cannot load settings");
            return exit_code(EXIT_FAILURE);
        }
    };
    init_logging(&settings.log_level);

    let catalog = match sample_catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "cannot build catalog");
            return exit_code(EXIT_FAILURE);
        }
    };
    let invoker = Invoker::new(&catalog, settings.search.clone());
    let tokens: Vec<String> = std::env::args().skip(1).collect();
    exit_code(chain::run(&invoker, &tokens, &settings.entry_marker))
}
