//! logging
//!
//! Subscriber setup for host applications.
//!
//! The library only emits `tracing` events; it never installs a subscriber
//! on its own. Hosts that have no subscriber of their own can call
//! [`init`] once at startup.
//!
//! ```text
//! RUST_LOG (if set) ──┐
//!                     ├─> EnvFilter ─> fmt layer (stderr, ANSI)
//! [log] filter ───────┘
//! ```

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::core::config::Config;

/// Errors from subscriber installation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Build the filter, preferring a non-empty `RUST_LOG` over `configured`.
pub fn build_filter(rust_log: Option<&str>, configured: &str) -> Result<EnvFilter, LoggingError> {
    let directive = rust_log
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(configured);

    EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        message: e.to_string(),
    })
}

/// Install a stderr fmt subscriber filtered by `filter` (or `RUST_LOG`).
///
/// # Errors
///
/// - `InvalidFilter` if the directive does not parse
/// - `AlreadyInitialized` if a global subscriber exists
pub fn init(filter: &str) -> Result<(), LoggingError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(rust_log.as_deref(), filter)?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// [`init`] with the `[log] filter` from `config`.
pub fn init_from_config(config: &Config) -> Result<(), LoggingError> {
    init(config.log_filter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_filter_used_without_rust_log() {
        let filter = build_filter(None, "article_sweep=debug").unwrap();
        assert_eq!(filter.to_string(), "article_sweep=debug");
    }

    #[test]
    fn rust_log_wins() {
        let filter = build_filter(Some("warn"), "debug").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn blank_rust_log_ignored() {
        let filter = build_filter(Some("  "), "info").unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn invalid_directive_rejected() {
        let err = build_filter(None, "article_sweep=loud").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
        assert!(err.to_string().contains("article_sweep=loud"));
    }

    #[test]
    fn second_init_reports_already_initialized() {
        // The first call may lose to another test in this binary.
        let _ = init("info");
        assert_eq!(init("info"), Err(LoggingError::AlreadyInitialized));
    }
}
