//! Logging bootstrap with PII redaction for the mail dispatch workspace
//!
//! Provides the `tracing` subscriber setup shared by every binary in the
//! workspace, plus small helpers that keep recipient addresses and transport
//! credentials out of structured log fields.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LoggerConfig, PiiRedactor};
//!
//! init_tracing(&LoggerConfig::default().verbose(true)).ok();
//!
//! let redactor = PiiRedactor::default();
//! tracing::info!(recipient = %redactor.redact("jane@example.com"), "Queued message");
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialised,
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when it is set.
///
/// # Errors
///
/// Returns [`LoggerError::InvalidFilter`] for an unparseable level directive
/// and [`LoggerError::AlreadyInitialised`] when called a second time.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| LoggerError::InvalidFilter {
            directive: config.log_level.clone(),
            reason: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_file(config.with_source_location)
                    .with_line_number(config.with_source_location)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(config.with_source_location)
                    .with_line_number(config.with_source_location),
            )
            .try_init()
    };

    installed.map_err(|_| LoggerError::AlreadyInitialised)
}
