//! Logging initialization and configuration.
//!
//! Diagnostics always go to stderr; stdout carries decoded exec output.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit level is given.
pub const DEFAULT_FILTER: &str = "container_exec=info";

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Expand a configured level into a filter directive.
///
/// A bare level such as `debug` applies to this crate only; anything else
/// (`container_exec=trace,tokio=debug`) is used as-is.
pub fn directive_for(level: &str) -> String {
    let level = level.trim();
    if LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        format!("container_exec={}", level.to_ascii_lowercase())
    } else {
        level.to_string()
    }
}

fn install(filter: EnvFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}

/// Try to initialize the logging system from `RUST_LOG`.
///
/// Falls back to `container_exec=info`. Returns `Err` if a subscriber is
/// already installed.
pub fn try_init() -> Result<(), TryInitError> {
    install(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
}

/// Try to initialize logging with an explicit level or directive.
///
/// Malformed directives fall back to [`DEFAULT_FILTER`].
pub fn init_with_filter(level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_new(directive_for(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_for_bare_level() {
        assert_eq!(directive_for("debug"), "container_exec=debug");
        assert_eq!(directive_for(" WARN "), "container_exec=warn");
    }

    #[test]
    fn test_directive_for_full_directive() {
        assert_eq!(
            directive_for("container_exec=trace,tokio=debug"),
            "container_exec=trace,tokio=debug"
        );
    }

    #[test]
    fn test_try_init_idempotent() {
        // First call may or may not succeed depending on test order
        let _ = try_init();
        let _ = try_init();
        let _ = init_with_filter("debug");
    }

    #[test]
    fn test_invalid_filter_falls_back() {
        let _ = init_with_filter("container_exec=[not valid");
        tracing::warn!("still logging");
    }
}
