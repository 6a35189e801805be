//! Run orchestration
//!
//! The [`Anonymizer`] owns the blueprint registry and drives the run: tables
//! are processed strictly one after another in registration order, either in
//! place (UPDATE on the source, sync triggers installed around each table) or
//! by replication into a target database.

use crate::adapters::database::Database;
use crate::blueprint::{declaration, Blueprint, BlueprintBuilder};
use crate::config::{AnonymizerConfig, TableConfig};
use crate::core::planner::{plan_select, plan_update};
use crate::core::replication::Replicator;
use crate::core::scheduler::Scheduler;
use crate::core::summary::{RunMode, RunSummary, TableSummary};
use crate::core::sync::Synchronizer;
use crate::domain::{Result, VeilError};
use crate::generator::Generator;
use crate::{log_table_complete, log_table_start};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run-wide knobs
#[derive(Debug, Clone)]
pub struct AnonymizerSettings {
    /// Wave ceiling of the scheduler
    pub max_in_flight: usize,

    /// Primary key applied to blueprints that declare none
    pub default_primary_key: Vec<String>,

    /// Prefix of sync trigger names
    pub trigger_prefix: String,

    /// Statements are logged but not executed
    pub dry_run: bool,
}

impl Default for AnonymizerSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 100,
            default_primary_key: vec!["id".to_string()],
            trigger_prefix: "veil_sync".to_string(),
            dry_run: false,
        }
    }
}

impl From<&AnonymizerConfig> for AnonymizerSettings {
    fn from(config: &AnonymizerConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight,
            default_primary_key: config.default_primary_key.clone(),
            trigger_prefix: config.trigger_prefix.clone(),
            dry_run: false,
        }
    }
}

/// Blueprint registry and run driver
pub struct Anonymizer {
    source: Arc<dyn Database>,
    target: Option<Arc<dyn Database>>,
    generator: Option<Arc<dyn Generator>>,
    settings: AnonymizerSettings,
    blueprints: Vec<Blueprint>,
}

impl Anonymizer {
    pub fn new(source: Arc<dyn Database>, settings: AnonymizerSettings) -> Self {
        Self {
            source,
            target: None,
            generator: None,
            settings,
            blueprints: Vec::new(),
        }
    }

    /// Supplies the generator used by generated and derived rules
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Switches the run to replication into `target`
    pub fn with_target(mut self, target: Arc<dyn Database>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn settings(&self) -> &AnonymizerSettings {
        &self.settings
    }

    pub fn mode(&self) -> RunMode {
        if self.target.is_some() {
            RunMode::Replication
        } else {
            RunMode::InPlace
        }
    }

    /// Registered blueprints in processing order
    pub fn blueprints(&self) -> &[Blueprint] {
        &self.blueprints
    }

    /// Declares and registers a table through the builder API
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Configuration`] if the declaration is invalid or
    /// the table is already registered.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use veil::adapters::database::Database;
    /// # use veil::core::anonymizer::{Anonymizer, AnonymizerSettings};
    /// # fn example(db: Arc<dyn Database>) -> veil::domain::Result<()> {
    /// let mut anonymizer = Anonymizer::new(db, AnonymizerSettings::default());
    /// anonymizer.table("users", |t| {
    ///     t.column("email").replace_with("user_#row#@example.com")
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn table<F>(&mut self, name: &str, declare: F) -> Result<&mut Self>
    where
        F: FnOnce(BlueprintBuilder) -> BlueprintBuilder,
    {
        let blueprint = declare(Blueprint::builder(name)).build(&self.settings.default_primary_key)?;
        self.register(blueprint)
    }

    /// Registers declarations loaded from configuration
    ///
    /// # Errors
    ///
    /// Same as [`Anonymizer::register`].
    pub fn declare_tables(&mut self, tables: &[TableConfig]) -> Result<&mut Self> {
        for table in tables {
            let blueprint = declaration::declare(table)?.build(&self.settings.default_primary_key)?;
            self.register(blueprint)?;
        }
        Ok(self)
    }

    /// Registers a built blueprint
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Configuration`] if the table is already registered
    /// or one of its sync targets is already fed by another blueprint.
    pub fn register(&mut self, blueprint: Blueprint) -> Result<&mut Self> {
        if self.blueprints.iter().any(|b| b.table() == blueprint.table()) {
            return Err(VeilError::Configuration(format!(
                "table '{}' is declared more than once",
                blueprint.table()
            )));
        }

        let claimed: HashSet<_> = self
            .blueprints
            .iter()
            .flat_map(|b| b.sync_rules())
            .flat_map(|r| &r.targets)
            .collect();
        for target in blueprint.sync_rules().iter().flat_map(|r| &r.targets) {
            if claimed.contains(target) {
                return Err(VeilError::Configuration(format!(
                    "sync target '{}.{}' of table '{}' is already synchronized from another table",
                    target.table,
                    target.column,
                    blueprint.table()
                )));
            }
        }

        self.blueprints.push(blueprint);
        Ok(self)
    }

    /// Restricts the run to `tables`, keeping registration order
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Configuration`] if a name is not registered.
    pub fn retain_tables(&mut self, tables: &[String]) -> Result<()> {
        if let Some(unknown) = tables
            .iter()
            .find(|t| !self.blueprints.iter().any(|b| b.table() == t.as_str()))
        {
            return Err(VeilError::Configuration(format!(
                "table '{unknown}' is not declared"
            )));
        }
        self.blueprints
            .retain(|b| tables.iter().any(|t| t == b.table()));
        Ok(())
    }

    /// Processes every registered table
    ///
    /// # Errors
    ///
    /// Fails fast on the first error. Sync triggers of the failing table are
    /// still removed; rows already written stay written.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let mode = self.mode();
        let mut summary = RunSummary::new(mode, self.settings.dry_run);

        if self.blueprints.is_empty() {
            warn!("No tables declared, nothing to anonymize");
            return Ok(summary.with_duration(started.elapsed()));
        }

        info!(
            mode = %mode,
            tables = self.blueprints.len(),
            max_in_flight = self.settings.max_in_flight,
            dry_run = self.settings.dry_run,
            "Starting anonymization run"
        );

        let scheduler = Scheduler::new(self.settings.max_in_flight);
        let generator = self.generator.as_deref();

        match &self.target {
            Some(target) => {
                let replicator =
                    Replicator::new(self.source.as_ref(), target.as_ref(), scheduler, generator);
                let (tables, restored) = replicator.replicate(&self.blueprints).await?;
                summary.tables = tables;
                summary.constraints_restored = restored;
            }
            None => {
                let source = self.source.as_ref();
                let synchronizer = Synchronizer::new(source, &self.settings.trigger_prefix);
                for blueprint in self.blueprints.iter_mut() {
                    let table = anonymize_in_place(
                        source,
                        &synchronizer,
                        scheduler,
                        generator,
                        blueprint,
                    )
                    .await?;
                    summary.tables.push(table);
                }
            }
        }

        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();
        Ok(summary)
    }
}

async fn anonymize_in_place(
    source: &dyn Database,
    synchronizer: &Synchronizer<'_>,
    scheduler: Scheduler,
    generator: Option<&dyn Generator>,
    blueprint: &mut Blueprint,
) -> Result<TableSummary> {
    let table = blueprint.table().to_string();
    log_table_start!(table, RunMode::InPlace);
    let started = Instant::now();

    synchronizer.install(blueprint).await?;
    let triggers = blueprint.active_triggers().len();

    let outcome = {
        let blueprint = &*blueprint;
        let select = plan_select(blueprint, blueprint.needs_full_row());
        let rows = source.stream(&select);
        scheduler
            .run(&table, rows, source, |row, index| {
                plan_update(blueprint, row, index, generator)
            })
            .await
    };

    let teardown = synchronizer.teardown(blueprint).await;
    let stats = outcome?;
    teardown?;

    let duration = started.elapsed();
    log_table_complete!(table, stats.rows, duration);
    Ok(TableSummary::new(table, stats, duration).with_triggers(triggers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnonymizerConfig;

    #[test]
    fn test_settings_from_config() {
        let config = AnonymizerConfig {
            max_in_flight: 7,
            trigger_prefix: "tmp".to_string(),
            ..Default::default()
        };
        let settings = AnonymizerSettings::from(&config);
        assert_eq!(settings.max_in_flight, 7);
        assert_eq!(settings.trigger_prefix, "tmp");
        assert!(!settings.dry_run);
    }
}
