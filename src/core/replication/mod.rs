//! Replication engine
//!
//! Copies the selected tables into a separate target database, anonymizing
//! rule columns on the way. Protocol for one run:
//!
//! 1. foreign-key checks are disabled on every target connection
//! 2. each table is recreated on the target from its source definition,
//!    minus the foreign keys pointing at selected tables
//! 3. rows are streamed from the source and inserted through the
//!    [`Scheduler`], leaving out server-generated columns
//! 4. once every table is loaded, the stripped foreign keys are re-added
//!
//! A failure after step 2 leaves the target without those constraints; they
//! are not repaired automatically.

pub mod foreign_keys;
pub mod schema;

pub use foreign_keys::{list_foreign_keys, ForeignKey};
pub use schema::{list_generated_columns, show_create_table, strip_foreign_keys};

use crate::adapters::database::Database;
use crate::blueprint::Blueprint;
use crate::core::planner::{plan_copy_select, plan_insert};
use crate::core::scheduler::Scheduler;
use crate::core::summary::TableSummary;
use crate::domain::{quote_ident, Result, VeilError};
use crate::generator::Generator;
use crate::{log_table_complete, log_table_start};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Copies blueprints' tables from `source` to `target`
pub struct Replicator<'a> {
    source: &'a dyn Database,
    target: &'a dyn Database,
    scheduler: Scheduler,
    generator: Option<&'a dyn Generator>,
}

impl<'a> Replicator<'a> {
    pub fn new(
        source: &'a dyn Database,
        target: &'a dyn Database,
        scheduler: Scheduler,
        generator: Option<&'a dyn Generator>,
    ) -> Self {
        Self {
            source,
            target,
            scheduler,
            generator,
        }
    }

    /// Replicates every table and restores the stripped foreign keys
    ///
    /// Returns the per-table summaries and the number of restored constraints.
    ///
    /// # Errors
    ///
    /// Fails fast on the first database, schema or resolution error.
    pub async fn replicate(&self, blueprints: &[Blueprint]) -> Result<(Vec<TableSummary>, usize)> {
        let tables: Vec<String> = blueprints.iter().map(|b| b.table().to_string()).collect();

        self.target.disable_foreign_key_checks().await?;

        let stripped = list_foreign_keys(self.source, &tables).await?;
        debug!(
            constraints = stripped.len(),
            "Foreign keys deferred until all tables are loaded"
        );

        let mut summaries = Vec::with_capacity(blueprints.len());
        for blueprint in blueprints {
            let constraints: Vec<&str> = stripped
                .iter()
                .filter(|k| k.table == blueprint.table())
                .map(|k| k.name.as_str())
                .collect();
            summaries.push(self.copy_table(blueprint, &constraints).await?);
        }

        let restored = self.restore_foreign_keys(&tables).await?;
        Ok((summaries, restored))
    }

    async fn copy_table(&self, blueprint: &Blueprint, constraints: &[&str]) -> Result<TableSummary> {
        let table = blueprint.table();
        log_table_start!(table, "replication");
        let started = Instant::now();

        if !blueprint.sync_rules().is_empty() {
            warn!(
                table = %table,
                rules = blueprint.sync_rules().len(),
                "Sync rules are ignored in replication mode"
            );
        }

        let generated = list_generated_columns(self.source, table).await?;
        if let Some(rule) = blueprint
            .columns()
            .iter()
            .find(|rule| generated.iter().any(|g| g == rule.name()))
        {
            return Err(VeilError::SchemaMismatch(format!(
                "column '{table}.{}' is generated by the server and cannot be replaced",
                rule.name()
            )));
        }

        let definition = show_create_table(self.source, table).await?;
        let definition = strip_foreign_keys(&definition, constraints)?;
        self.target
            .execute_raw(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
            .await?;
        self.target.execute_raw(&definition).await?;
        debug!(table = %table, stripped = constraints.len(), "Recreated table on target");

        let select = plan_copy_select(blueprint);
        let rows = self.source.stream(&select);
        let generator = self.generator;
        let stats = self
            .scheduler
            .run(table, rows, self.target, |row, index| {
                plan_insert(blueprint, row, index, generator, &generated).map(Some)
            })
            .await?;

        let duration = started.elapsed();
        log_table_complete!(table, stats.rows, duration);
        Ok(TableSummary::new(table, stats, duration))
    }

    async fn restore_foreign_keys(&self, tables: &[String]) -> Result<usize> {
        let keys = list_foreign_keys(self.source, tables).await?;
        for key in &keys {
            self.target.execute_raw(&key.add_constraint_sql()).await?;
            debug!(
                table = %key.table,
                constraint = %key.name,
                self_reference = key.is_self_reference(),
                "Restored foreign key"
            );
        }
        info!(constraints = keys.len(), "Foreign keys restored on target");
        Ok(keys.len())
    }
}
