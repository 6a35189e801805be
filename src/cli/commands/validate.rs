//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Veil configuration file without touching any database.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates, including every table declaration
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(e.exit_code());
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!(
            "  Source: {}:{}/{}",
            config.source.host, config.source.port, config.source.database
        );
        match &config.target {
            Some(target) => {
                println!("  Mode: replication");
                println!(
                    "  Target: {}:{}/{}",
                    target.host, target.port, target.database
                );
            }
            None => println!("  Mode: in-place"),
        }
        println!("  Max In Flight: {}", config.anonymizer.max_in_flight);
        println!("  Locale: {}", config.anonymizer.default_locale);
        println!("  Tables: {}", config.tables.len());
        for table in &config.tables {
            let sync_targets: usize = table.sync.iter().map(|s| s.targets.len()).sum();
            println!(
                "    - {} ({} column rules, {} sync targets)",
                table.name,
                table.columns.len(),
                sync_targets
            );
        }
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file_is_config_error() {
        let args = ValidateArgs {};
        let code = args.execute("does-not-exist.toml").await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[source]
host = "localhost"
user = "app"
password = "secret"
database = "shop"

[[tables]]
name = "users"

[[tables.columns]]
name = "email"
replace_with = "user_#row#@example.com"
"#
        )
        .unwrap();
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
