//! Subscriber installation
//!
//! Two sinks share one filter: a human-readable console layer and, when
//! `[logging] local_enabled` is set, a JSON layer written through a
//! non-blocking rolling appender. The filter admits `veil` events at the
//! configured level and driver warnings (slow statements, pool trouble)
//! from `sqlx`. Statement text is emitted at `trace` by the MySQL client,
//! so anything above `trace` keeps rendered values out of the logs.

use crate::config::LoggingConfig;
use crate::domain::{Result, VeilError};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "veil.log";

/// Keeps the file writer alive; buffered lines are flushed on drop
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global subscriber
///
/// `RUST_LOG` takes precedence over `log_level` when set. Must be called at
/// most once per process; the returned guard has to outlive the run.
///
/// ```no_run
/// use veil::config::LoggingConfig;
/// use veil::logging::init_logging;
///
/// let _guard = init_logging("debug", &LoggingConfig::default())?;
/// # Ok::<(), veil::domain::VeilError>(())
/// ```
///
/// # Errors
///
/// Returns [`VeilError::Configuration`] for an unknown level or rotation, or
/// when the log directory cannot be created.
pub fn init_logging(log_level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(log_level)?;
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)))
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter())
        .boxed();

    let (file, file_guard) = if config.local_enabled {
        let rotation = rotation(&config.local_rotation)?;
        std::fs::create_dir_all(&config.local_path).map_err(|e| {
            VeilError::Configuration(format!(
                "Failed to create log directory {}: {e}",
                config.local_path
            ))
        })?;

        let appender = RollingFileAppender::new(rotation, &config.local_path, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(writer)
            .with_filter(filter())
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry().with(console).with(file).init();

    tracing::debug!(
        level = %level,
        file = config.local_enabled,
        path = %config.local_path,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter directives used when `RUST_LOG` is not set
fn directives(level: Level) -> String {
    let level = level.to_string().to_lowercase();
    format!("veil={level},sqlx=warn")
}

fn rotation(name: &str) -> Result<Rotation> {
    match name {
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        "never" => Ok(Rotation::NEVER),
        other => Err(VeilError::Configuration(format!(
            "Invalid local_rotation '{other}'. Must be one of: daily, hourly, never"
        ))),
    }
}

/// Parses a level name, case-insensitively
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(VeilError::Configuration(format!(
            "Invalid log level: {level}. Must be one of: trace, debug, info, warn, error"
        ))),
    }
}
