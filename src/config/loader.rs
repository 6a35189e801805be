//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseConfig, VeilConfig};
use super::secret_string;
use crate::domain::errors::VeilError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into VeilConfig
/// 4. Applies environment variable overrides (VEIL_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`VeilError::Configuration`] if the file cannot be read or parsed,
/// a referenced environment variable is missing, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use veil::config::loader::load_config;
///
/// let config = load_config("veil.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<VeilConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(VeilError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        VeilError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration text
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<VeilConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: VeilConfig = toml::from_str(&contents)
        .map_err(|e| VeilError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        VeilError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| VeilError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(VeilError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        VeilError::Configuration(format!("{name}='{value}' is not a valid value"))
    })
}

fn apply_database_overrides(prefix: &str, db: &mut DatabaseConfig) -> Result<()> {
    let var = |key: &str| std::env::var(format!("{prefix}_{key}")).ok();

    if let Some(val) = var("HOST") {
        db.host = val;
    }
    if let Some(val) = var("PORT") {
        db.port = parse_override(&format!("{prefix}_PORT"), &val)?;
    }
    if let Some(val) = var("USER") {
        db.user = val;
    }
    if let Some(val) = var("PASSWORD") {
        db.password = secret_string(val);
    }
    if let Some(val) = var("DATABASE") {
        db.database = val;
    }
    if let Some(val) = var("MAX_CONNECTIONS") {
        db.max_connections = parse_override(&format!("{prefix}_MAX_CONNECTIONS"), &val)?;
    }
    if let Some(val) = var("CONNECT_TIMEOUT_SECONDS") {
        db.connect_timeout_seconds =
            parse_override(&format!("{prefix}_CONNECT_TIMEOUT_SECONDS"), &val)?;
    }
    Ok(())
}

/// Applies environment variable overrides using VEIL_* prefix
///
/// Environment variables follow the pattern: VEIL_<SECTION>_<KEY>
/// For example: VEIL_SOURCE_HOST, VEIL_ANONYMIZER_MAX_IN_FLIGHT
///
/// # Errors
///
/// Returns an error if a numeric or boolean override does not parse.
fn apply_env_overrides(config: &mut VeilConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("VEIL_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("VEIL_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_override("VEIL_APPLICATION_DRY_RUN", &val)?;
    }

    // Database overrides
    apply_database_overrides("VEIL_SOURCE", &mut config.source)?;
    if let Some(ref mut target) = config.target {
        apply_database_overrides("VEIL_TARGET", target)?;
    }

    // Anonymizer overrides
    if let Ok(val) = std::env::var("VEIL_ANONYMIZER_MAX_IN_FLIGHT") {
        config.anonymizer.max_in_flight = parse_override("VEIL_ANONYMIZER_MAX_IN_FLIGHT", &val)?;
    }
    if let Ok(val) = std::env::var("VEIL_ANONYMIZER_DEFAULT_LOCALE") {
        config.anonymizer.default_locale = val;
    }
    if let Ok(val) = std::env::var("VEIL_ANONYMIZER_TRIGGER_PREFIX") {
        config.anonymizer.trigger_prefix = val;
    }
    if let Ok(val) = std::env::var("VEIL_ANONYMIZER_GENERATOR_SEED") {
        config.anonymizer.generator_seed =
            Some(parse_override("VEIL_ANONYMIZER_GENERATOR_SEED", &val)?);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("VEIL_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[source]
host = "127.0.0.1"
user = "app"
password = "pass"
database = "app"
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("VEIL_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${VEIL_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("VEIL_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("VEIL_LOADER_MISSING_VAR");
        let input = "password = \"${VEIL_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("VEIL_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# password = \"${VEIL_LOADER_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(VeilError::Configuration(_))));
    }

    #[test]
    fn test_load_config_minimal_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.source.port, 3306);
        assert_eq!(config.source.password.expose_secret(), "pass");
        assert_eq!(config.anonymizer.max_in_flight, 100);
        assert_eq!(config.anonymizer.default_primary_key, vec!["id".to_string()]);
        assert!(config.target.is_none());
        assert!(config.tables.is_empty());
    }

    #[test]
    fn test_parse_override_rejects_garbage() {
        let err = parse_override::<usize>("VEIL_X", "many").unwrap_err();
        assert!(err.to_string().contains("VEIL_X"));
        assert_eq!(parse_override::<bool>("VEIL_X", " true ").unwrap(), true);
    }

    #[test]
    fn test_missing_source_is_error() {
        let err = parse_config("[application]\nlog_level = \"info\"\n").unwrap_err();
        assert!(matches!(err, VeilError::Configuration(_)));
    }
}
