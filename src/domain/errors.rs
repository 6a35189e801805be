//! Domain error types
//!
//! This module defines the error hierarchy for Veil. Every fallible path in the
//! library returns [`VeilError`]; driver-specific error types are converted at
//! the adapter boundary so callers never see `sqlx` types.

use thiserror::Error;

/// Main Veil error type
///
/// Variants follow the run's failure taxonomy: configuration problems are
/// reported before any database I/O, everything else aborts the run.
#[derive(Debug, Error)]
pub enum VeilError {
    /// Invalid or missing startup settings, or an invalid table declaration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A rule needs generated values but the anonymizer has no generator
    #[error("Generator required: {0}")]
    GeneratorRequired(String),

    /// The generator could not produce a value (unknown name, unique exhaustion)
    #[error("Generator error: {0}")]
    Generator(String),

    /// A SELECT, UPDATE, INSERT or DDL statement failed
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Replication found table or foreign-key metadata it did not expect
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Database-specific errors
///
/// These errors don't expose third-party driver types.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to the server
    #[error("Failed to connect to {host}: {message}")]
    ConnectionFailed { host: String, message: String },

    /// Failed to obtain or configure a pooled connection
    #[error("Connection pool error: {0}")]
    PoolFailed(String),

    /// A statement was rejected by the server
    #[error("Statement failed: {message} (statement: {statement})")]
    QueryFailed { statement: String, message: String },

    /// A column value could not be decoded
    #[error("Failed to decode column '{column}': {message}")]
    DecodeFailed { column: String, message: String },
}

impl DatabaseError {
    /// Creates a [`DatabaseError::QueryFailed`] for the given statement text
    pub fn query_failed(statement: impl Into<String>, message: impl std::fmt::Display) -> Self {
        DatabaseError::QueryFailed {
            statement: statement.into(),
            message: message.to_string(),
        }
    }
}

impl VeilError {
    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            VeilError::Configuration(_) => 2,
            VeilError::Database(DatabaseError::ConnectionFailed { .. }) => 4,
            _ => 5,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        VeilError::Io(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VeilError {
    fn from(err: toml::de::Error) -> Self {
        VeilError::Configuration(format!("TOML parse error: {err}"))
    }
}
