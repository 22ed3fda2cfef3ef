//! Structured logging setup.
//!
//! Every Signet process initializes tracing through here so log shape is
//! uniform across services:
//! - `LOG_FORMAT=json` switches to JSON lines for log aggregation
//! - anything else emits human-readable text
//! - `RUST_LOG` filters as usual (default: `info`)
//!
//! Security note: credential material (passwords, token cleartexts, ABAC
//! condition bodies) must never reach a log line. Call sites log opaque
//! identifiers only; this module cannot enforce that, it just documents it.

use tracing_subscriber::{fmt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line text.
    Text,
    /// One JSON object per line, events flattened.
    Json,
}

impl LogFormat {
    /// Resolve the format from the `LOG_FORMAT` environment variable.
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Initialize the global tracing subscriber for a service.
///
/// `service` is attached to every line so aggregated logs from multiple
/// Signet processes stay distinguishable.
pub fn init(service: &'static str) {
    init_with_format(service, LogFormat::from_env());
}

/// Initialize with an explicit format (used by tools and tests that must
/// not consult the environment).
pub fn init_with_format(service: &'static str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            fmt()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_env_filter(filter)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
        }
        LogFormat::Text => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(true)
                .init();
        }
    }

    tracing::info!(service, "logging initialized");
}
