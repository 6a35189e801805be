//! Run command implementation
//!
//! This module implements the `run` command, which anonymizes the declared
//! tables in place or replicates them into the target database.

use crate::adapters::database::create_database;
use crate::config::{load_config, VeilConfig};
use crate::core::anonymizer::{Anonymizer, AnonymizerSettings};
use crate::core::summary::RunSummary;
use crate::generator::{FakeGenerator, Generator};
use clap::Args;
use std::sync::Arc;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - log statements without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Restrict the run to these tables (comma-separated)
    #[arg(long)]
    pub table: Option<String>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("{e}");
                return Ok(e.exit_code());
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        let dry_run = config.application.dry_run;

        let tables = self.selected_tables();

        if dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - statements are logged, nothing is written");
            println!();
        }

        if !self.yes && !dry_run && !confirm(&config, tables.as_deref())? {
            println!("Run cancelled.");
            return Ok(0);
        }

        let mut anonymizer = match build_anonymizer(&config, dry_run).await {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize run");
                eprintln!("Failed to initialize run: {e}");
                return Ok(e.exit_code());
            }
        };

        if let Some(tables) = &tables {
            tracing::info!(tables = ?tables, "Restricting run to tables from CLI");
            if let Err(e) = anonymizer.retain_tables(tables) {
                eprintln!("{e}");
                return Ok(e.exit_code());
            }
        }

        println!("🚀 Starting {} run...", anonymizer.mode());
        println!();

        let summary = match anonymizer.run().await {
            Ok(s) => s,
            Err(e) => {
                crate::log_error_with_context!(&e, "Run aborted");
                eprintln!("Run failed: {e}");
                eprintln!("Sync triggers, stripped foreign keys or partially processed tables may remain.");
                return Ok(e.exit_code());
            }
        };

        print_summary(&summary);
        println!("✅ Run completed successfully!");
        Ok(0)
    }

    fn selected_tables(&self) -> Option<Vec<String>> {
        self.table.as_ref().map(|list| {
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}

async fn build_anonymizer(config: &VeilConfig, dry_run: bool) -> crate::domain::Result<Anonymizer> {
    let source = create_database(&config.source, dry_run).await?;

    let generator: Arc<dyn Generator> = match config.anonymizer.generator_seed {
        Some(seed) => Arc::new(FakeGenerator::seeded(config.anonymizer.locale(), seed)),
        None => Arc::new(FakeGenerator::new(config.anonymizer.locale())),
    };

    let settings = AnonymizerSettings {
        dry_run,
        ..AnonymizerSettings::from(&config.anonymizer)
    };
    let mut anonymizer = Anonymizer::new(source, settings).with_generator(generator);

    if let Some(target) = &config.target {
        anonymizer = anonymizer.with_target(create_database(target, dry_run).await?);
    }

    anonymizer.declare_tables(&config.tables)?;
    Ok(anonymizer)
}

fn confirm(config: &VeilConfig, tables: Option<&[String]>) -> anyhow::Result<bool> {
    use std::io::{self, Write};

    println!("Run Configuration:");
    println!(
        "  Source: {}@{}:{}/{}",
        config.source.user, config.source.host, config.source.port, config.source.database
    );
    match &config.target {
        Some(target) => println!(
            "  Target: {}@{}:{}/{} (tables are dropped and recreated)",
            target.user, target.host, target.port, target.database
        ),
        None => println!("  Target: none (rows are updated in place)"),
    }
    let declared: Vec<&str> = config.tables.iter().map(|t| t.name.as_str()).collect();
    match tables {
        Some(tables) => println!("  Tables: {tables:?}"),
        None => println!("  Tables: {declared:?}"),
    }
    println!("  Max in flight: {}", config.anonymizer.max_in_flight);
    println!();
    print!("Proceed? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("📊 Run Summary ({}):", summary.mode);
    for table in &summary.tables {
        println!(
            "  {}: {} rows read, {} statements, {} waves, {:.2}s",
            table.table,
            table.rows_read,
            table.statements,
            table.waves,
            table.duration.as_secs_f64()
        );
    }
    if summary.constraints_restored > 0 {
        println!("  Foreign keys restored: {}", summary.constraints_restored);
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
}
