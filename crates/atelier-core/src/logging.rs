//! Tracing subscriber setup.
//!
//! The level comes from `RUST_LOG` when set:
//!
//! ```bash
//! RUST_LOG=atelier_core=debug,tower_http=debug,sqlx=warn atelier serve
//! ```
//!
//! Each `init_*` function installs a global subscriber and panics if one is
//! already installed. Call exactly one of them at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Compact logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    init_logging_with_level("info");
}

/// Compact logs with an explicit default level.
pub fn init_logging_with_level(level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Multi-line, colorized output for local development.
pub fn init_logging_pretty() {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(true),
        )
        .init();
}

/// One JSON object per event, for log shippers.
pub fn init_logging_json() {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Pick the subscriber from a `LOG_FORMAT` value. Unknown values fall back
/// to compact output.
pub fn init_logging_for(format: &str) {
    match format.trim().to_ascii_lowercase().as_str() {
        "json" => init_logging_json(),
        "pretty" => init_logging_pretty(),
        _ => init_logging(),
    }
}
