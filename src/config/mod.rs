//! Configuration management for Veil.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Veil uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `VEIL_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every table declaration before any database I/O
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use veil::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("veil.toml")?;
//!
//! println!("Source: {}/{}", config.source.host, config.source.database);
//! for table in &config.tables {
//!     println!("Table: {} ({} column rules)", table.name, table.columns.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run mode
//! - [`DatabaseConfig`] - `[source]` and optional `[target]` connections
//! - [`AnonymizerConfig`] - Wave size, generator locale, default primary key
//! - [`LoggingConfig`] - Local file logging
//! - [`TableConfig`] - `[[tables]]` anonymization declarations
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! host = "127.0.0.1"
//! user = "app"
//! password = "${VEIL_SOURCE_PASSWORD}"
//! database = "app"
//!
//! [[tables]]
//! name = "users"
//!
//!   [[tables.columns]]
//!   name = "email"
//!   replace_with = "email_#row#@example.com"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    AnonymizerConfig, ApplicationConfig, ColumnConfig, DatabaseConfig, LiteralValue,
    LoggingConfig, SyncConfig, SyncTargetConfig, TableConfig, VeilConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
