//! Configuration schema types
//!
//! This module defines the configuration structure for Veil: connection
//! settings for the source and optional target database, engine tuning, and
//! the `[[tables]]` anonymization declarations.

use crate::blueprint::declaration::declare;
use crate::config::SecretString;
use crate::generator::Locale;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;

/// Main Veil configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeilConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Database whose tables are anonymized (or read from, in replication mode)
    pub source: DatabaseConfig,

    /// Database receiving the anonymized copy; enables replication mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<DatabaseConfig>,

    /// Engine settings
    #[serde(default)]
    pub anonymizer: AnonymizerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Table declarations, processed in order
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl VeilConfig {
    /// Validates the configuration
    ///
    /// Table declarations are fully built against the default primary key,
    /// so every error a run could hit at declaration time surfaces here.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.validate("source")?;
        if let Some(target) = &self.target {
            target.validate("target")?;
        }
        // In place, the read cursor keeps one source connection for the
        // whole table while every wave needs at least one more.
        if self.target.is_none() && self.source.max_connections < 2 {
            return Err(format!(
                "source.max_connections must be at least 2 when anonymizing in place, got {}",
                self.source.max_connections
            ));
        }
        self.anonymizer.validate()?;
        self.logging.validate()?;

        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(format!("table '{}' is declared more than once", table.name));
            }
            declare(table)
                .and_then(|builder| builder.build(&self.anonymizer.default_primary_key))
                .map_err(|e| format!("tables.{}: {e}", table.name))?;
        }
        Ok(())
    }

    /// Returns true when a target database is configured
    pub fn is_replication(&self) -> bool {
        self.target.is_some()
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (plan and log statements, never write)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// MySQL connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// IP address or hostname
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    /// Stored securely in memory and automatically zeroized on drop
    pub password: SecretString,

    /// Schema name
    pub database: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

impl DatabaseConfig {
    fn validate(&self, section: &str) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err(format!("{section}.host cannot be empty"));
        }
        if !is_valid_host(&self.host)? {
            return Err(format!(
                "{section}.host '{}' is not a valid IP address or hostname",
                self.host
            ));
        }
        if self.port == 0 {
            return Err(format!("{section}.port must be > 0"));
        }
        if self.user.trim().is_empty() {
            return Err(format!("{section}.user cannot be empty"));
        }
        if self.database.trim().is_empty() {
            return Err(format!("{section}.database cannot be empty"));
        }
        if self.max_connections == 0 || self.max_connections > 500 {
            return Err(format!(
                "{section}.max_connections must be between 1 and 500, got {}",
                self.max_connections
            ));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(format!("{section}.connect_timeout_seconds must be > 0"));
        }
        Ok(())
    }
}

fn is_valid_host(host: &str) -> Result<bool, String> {
    if host.parse::<IpAddr>().is_ok() {
        return Ok(true);
    }
    if host.len() > 253 {
        return Ok(false);
    }
    let hostname = Regex::new(
        r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .map_err(|e| format!("invalid hostname pattern: {e}"))?;
    Ok(hostname.is_match(host))
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizerConfig {
    /// Statements issued per wave before the scheduler waits for all of them
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Locale of the bundled value generator
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Primary key applied to tables that do not declare one
    #[serde(default = "default_primary_key")]
    pub default_primary_key: Vec<String>,

    /// Prefix of the names of installed sync triggers
    #[serde(default = "default_trigger_prefix")]
    pub trigger_prefix: String,

    /// Fixed generator seed for reproducible generated values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_seed: Option<u64>,
}

impl AnonymizerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_in_flight == 0 || self.max_in_flight > 10_000 {
            return Err(format!(
                "anonymizer.max_in_flight must be between 1 and 10000, got {}",
                self.max_in_flight
            ));
        }
        self.default_locale
            .parse::<Locale>()
            .map_err(|e| format!("anonymizer.default_locale: {e}"))?;
        if self.default_primary_key.is_empty()
            || self.default_primary_key.iter().any(|c| c.trim().is_empty())
        {
            return Err("anonymizer.default_primary_key cannot be empty".to_string());
        }
        let prefix = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,31}$")
            .map_err(|e| format!("invalid trigger prefix pattern: {e}"))?;
        if !prefix.is_match(&self.trigger_prefix) {
            return Err(format!(
                "anonymizer.trigger_prefix '{}' must be 1-32 letters, digits or underscores",
                self.trigger_prefix
            ));
        }
        Ok(())
    }

    /// Parsed generator locale
    pub fn locale(&self) -> Locale {
        Locale::parse(&self.default_locale).unwrap_or_default()
    }
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            default_locale: default_locale(),
            default_primary_key: default_primary_key(),
            trigger_prefix: default_trigger_prefix(),
            generator_seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// One `[[tables]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,

    /// Overrides `anonymizer.default_primary_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,

    /// SQL expression restricting which rows are processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(default)]
    pub columns: Vec<ColumnConfig>,

    #[serde(default)]
    pub sync: Vec<SyncConfig>,
}

/// One `[[tables.columns]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,

    /// Fixed replacement; text may contain `#row#`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_with: Option<LiteralValue>,

    /// Generator name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<String>,

    /// Never repeat a generated value within the run
    #[serde(default)]
    pub unique: bool,

    /// Template over the row, e.g. `{first_name}.{last_name}@{fake:domain_suffix}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive: Option<String>,

    /// SQL expression gating the replacement per row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Literal accepted by `replace_with`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// One `[[tables.sync]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub column: String,
    pub targets: Vec<SyncTargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTargetConfig {
    pub table: String,
    pub column: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_max_connections() -> u32 {
    20
}

fn default_connect_timeout_seconds() -> u64 {
    30
}

fn default_max_in_flight() -> usize {
    100
}

fn default_locale() -> String {
    Locale::default().as_str().to_string()
}

fn default_primary_key() -> Vec<String> {
    vec!["id".to_string()]
}

fn default_trigger_prefix() -> String {
    "veil_sync".to_string()
}

fn default_local_path() -> String {
    "/var/log/veil".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
