//! Logging bootstrap shared by `chomp-worker`, `chomp-api`, and
//! `chomp-cli`. Grounded on the `tracing-subscriber` setup used throughout
//! `cloud-service` in the teacher repo (env-filter + fmt layer, optional
//! JSON rendering for production).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Initializes the global tracing subscriber. Should be called exactly once
/// at process start, before any other `chomp-*` code runs.
///
/// The filter defaults to `info` and honors `RUST_LOG` if set, matching the
/// teacher's convention of deferring to the env var when present.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_current_span(true)).init();
        }
        LogFormat::Pretty => {
            registry.with(fmt::layer().with_target(true)).init();
        }
    }
}
