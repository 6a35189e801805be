//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "veil.toml")]
    pub output: String,

    /// Include example table declarations and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Veil configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your connection settings", self.output);
                println!("  2. Declare the tables and columns to anonymize under [[tables]]");
                println!("  3. Create a .env file with VEIL_SOURCE_PASSWORD (and VEIL_TARGET_PASSWORD)");
                println!("  4. Validate configuration: veil validate-config");
                println!("  5. Preview the statements: veil run --dry-run");
                println!("  6. Run: veil run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Veil Configuration File
# MySQL data anonymizer

[application]
log_level = "info"
dry_run = false

[source]
host = "localhost"
port = 3306
user = "veil"
password = "${VEIL_SOURCE_PASSWORD}"
database = "app"

[anonymizer]
max_in_flight = 100
default_locale = "en_US"

[[tables]]
name = "users"

[[tables.columns]]
name = "email"
replace_with = "user_#row#@example.com"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Veil Configuration File
# MySQL data anonymizer
#
# Rows are rewritten in place on [source] unless a [target] is configured,
# in which case every declared table is dropped and recreated on the target
# and filled with an anonymized copy of the source rows.
#
# Any value can reference environment variables as ${VAR_NAME}; every
# setting can also be overridden with VEIL_<SECTION>_<KEY>, for example
# VEIL_SOURCE_HOST or VEIL_ANONYMIZER_MAX_IN_FLIGHT.

[application]
log_level = "info"              # trace | debug | info | warn | error
dry_run = false                 # log statements instead of executing them

[source]
host = "localhost"
port = 3306
user = "veil"
password = "${VEIL_SOURCE_PASSWORD}"
database = "app"
max_connections = 20            # connection pool size
connect_timeout_seconds = 30

# Uncomment to replicate into another database instead of updating in place
# [target]
# host = "localhost"
# port = 3306
# user = "veil"
# password = "${VEIL_TARGET_PASSWORD}"
# database = "app_anonymized"

[anonymizer]
max_in_flight = 100             # statements per wave
default_locale = "en_US"        # en_US | fr_FR | de_DE | pt_BR | ja_JP | zh_CN
default_primary_key = ["id"]
trigger_prefix = "veil_sync"
# generator_seed = 42           # reproducible generated values

[logging]
local_enabled = false
local_path = "/var/log/veil"
local_rotation = "daily"        # daily | hourly | never

# One [[tables]] entry per table, processed in order.
[[tables]]
name = "users"
filter = "deleted_at IS NULL"   # rows outside the filter are left untouched

# Fixed value; #row# is replaced with the row's position in the read
[[tables.columns]]
name = "email"
replace_with = "user_#row#@example.com"
filter = "role != 'admin'"      # keep admin addresses

# Generated value
[[tables.columns]]
name = "first_name"
generate = "first_name"

[[tables.columns]]
name = "username"
generate = "username"
unique = true

# Value derived from other columns of the same row
[[tables.columns]]
name = "display_name"
derive = "{first_name} {fake:last_name}"

# Keep copies of the email in other tables consistent (in-place mode only)
[[tables.sync]]
column = "email"
targets = [{ table = "orders", column = "customer_email" }]

[[tables]]
name = "order_items"
primary_key = ["order_id", "line"]

[[tables.columns]]
name = "note"
replace_with = ""
"#
        .to_string()
    }
}
