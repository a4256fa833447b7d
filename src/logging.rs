//! Structured logging configuration.
//!
//! Uses `tracing` with `tracing-subscriber` for configurable log levels and
//! output formats.
//!
//! ## Environment variables
//!
//! - `REACHBOT_LOG` or `RUST_LOG`: filter directive (e.g. `debug`,
//!   `reachbot=debug,warn`)
//! - `REACHBOT_LOG_FORMAT`: output format (`pretty`, `compact`, `json`)

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "reachbot=info,warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line output.
    #[default]
    Compact,
    /// Human-readable multi-line output.
    Pretty,
    /// JSON output for log aggregation.
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Initialize the global tracing subscriber from the environment.
///
/// Call once at program start; later calls are ignored.
pub fn init_from_env() {
    let filter = std::env::var("REACHBOT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let format = std::env::var("REACHBOT_LOG_FORMAT")
        .map(|s| LogFormat::parse(&s))
        .unwrap_or_default();
    init(&filter, format);
}

/// Initialize the global tracing subscriber with an explicit configuration.
pub fn init(filter: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact());
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
}
