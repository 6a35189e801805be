//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local file logging with rotation
//!
//! Statement text is only logged at `trace`; replacement values can be
//! sensitive and never appear at `info`.
//!
//! # Example
//!
//! ```no_run
//! use veil::logging::init_logging;
//! use veil::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table = "users", "Anonymizing");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of a table's processing phase
///
/// # Example
///
/// ```no_run
/// use veil::log_table_start;
///
/// log_table_start!("users", "in-place");
/// ```
#[macro_export]
macro_rules! log_table_start {
    ($table:expr, $mode:expr) => {
        tracing::info!(table = %$table, mode = %$mode, "Processing table");
    };
}

/// Log the completion of a table's processing phase
///
/// # Example
///
/// ```no_run
/// use veil::log_table_complete;
/// use std::time::Duration;
///
/// log_table_complete!("users", 1200, Duration::from_millis(850));
/// ```
#[macro_export]
macro_rules! log_table_complete {
    ($table:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            table = %$table,
            rows = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Table completed"
        );
    };
}

/// Log a drained wave of in-flight statements
///
/// # Example
///
/// ```no_run
/// use veil::log_wave_drained;
///
/// log_wave_drained!("users", 3, 100);
/// ```
#[macro_export]
macro_rules! log_wave_drained {
    ($table:expr, $wave:expr, $size:expr) => {
        tracing::debug!(table = %$table, wave = $wave, size = $size, "Wave drained");
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use veil::log_error_with_context;
/// use veil::domain::VeilError;
///
/// let error = VeilError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
