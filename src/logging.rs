//! Logging setup for the command-line tool.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV_VAR: &str = "SCHED_CONFIG_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Filter directive: `SCHED_CONFIG_LOG`, then `RUST_LOG`, then a default
/// that `verbose` raises from `warn` to `debug`.
fn filter_directive(verbose: bool) -> String {
    std::env::var(LOG_ENV_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| {
            if verbose {
                "debug".to_string()
            } else {
                "warn".to_string()
            }
        })
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init_logging(verbose: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_new(filter_directive(verbose))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // Something else may have installed a global subscriber already.
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
