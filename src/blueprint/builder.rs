//! Fluent declaration API for blueprints
//!
//! ```
//! use veil::blueprint::Blueprint;
//!
//! let blueprint = Blueprint::builder("users")
//!     .global_filter("deleted_at IS NULL")
//!     .column("email")
//!     .filter("id != 1")
//!     .replace_with("email_#row#@example.com")
//!     .column("first_name")
//!     .replace_with_generated(|g| g.generate("first_name"))
//!     .sync("email")
//!     .to("orders", "customer_email")
//!     .build(&["id".to_string()])
//!     .unwrap();
//!
//! assert_eq!(blueprint.columns().len(), 2);
//! ```

use super::{Blueprint, ColumnRule, Replacement, SyncRule, SyncTarget};
use crate::domain::{Result, Row, SqlValue, VeilError};
use crate::generator::Generator;
use std::collections::HashSet;

/// Collects the declarations for one table
#[derive(Debug, Clone)]
pub struct BlueprintBuilder {
    table: String,
    primary_key: Vec<String>,
    columns: Vec<ColumnRule>,
    global_filters: Vec<String>,
    sync_rules: Vec<SyncRule>,
}

impl BlueprintBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: Vec::new(),
            columns: Vec::new(),
            global_filters: Vec::new(),
            sync_rules: Vec::new(),
        }
    }

    /// Table being declared
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Sets the primary key; the default key applies when never called
    pub fn primary<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a global row filter; repeated calls are combined with `AND`
    pub fn global_filter(mut self, filter: impl Into<String>) -> Self {
        self.global_filters.push(filter.into());
        self
    }

    /// Starts a column rule
    pub fn column(self, name: impl Into<String>) -> ColumnBuilder {
        ColumnBuilder {
            parent: self,
            name: name.into(),
            filter: None,
        }
    }

    /// Adds an already constructed column rule
    pub fn rule(mut self, rule: ColumnRule) -> Self {
        self.columns.push(rule);
        self
    }

    /// Starts a synchronization rule for `column`
    pub fn sync(self, column: impl Into<String>) -> SyncBuilder {
        SyncBuilder {
            parent: self,
            column: column.into(),
        }
    }

    fn push_sync_target(&mut self, column: String, target: SyncTarget) {
        match self.sync_rules.iter_mut().find(|rule| rule.column == column) {
            Some(rule) => rule.targets.push(target),
            None => self.sync_rules.push(SyncRule {
                column,
                targets: vec![target],
            }),
        }
    }

    /// Materializes the blueprint
    ///
    /// Applies `default_primary_key` when no key was declared.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Configuration`] for an empty table, column or key
    /// name, a rule on a primary-key column, a column declared twice, or a sync
    /// target listed twice or pointing back at its own table (a trigger cannot
    /// update the table it fires on).
    pub fn build(self, default_primary_key: &[String]) -> Result<Blueprint> {
        let table = self.table.trim().to_string();
        if table.is_empty() {
            return Err(VeilError::Configuration(
                "table name cannot be empty".to_string(),
            ));
        }

        let primary_key = if self.primary_key.is_empty() {
            default_primary_key.to_vec()
        } else {
            self.primary_key
        };
        if primary_key.is_empty() {
            return Err(VeilError::Configuration(format!(
                "table '{table}' has no primary key and no default is configured"
            )));
        }
        if primary_key.iter().any(|pk| pk.trim().is_empty()) {
            return Err(VeilError::Configuration(format!(
                "table '{table}' has an empty primary key column name"
            )));
        }

        let mut seen = HashSet::new();
        for rule in &self.columns {
            if rule.name().trim().is_empty() {
                return Err(VeilError::Configuration(format!(
                    "table '{table}' declares a column rule without a name"
                )));
            }
            if primary_key.iter().any(|pk| pk == rule.name()) {
                return Err(VeilError::Configuration(format!(
                    "column '{}' of table '{table}' is part of the primary key and cannot be replaced",
                    rule.name()
                )));
            }
            if !seen.insert(rule.name()) {
                return Err(VeilError::Configuration(format!(
                    "column '{}' of table '{table}' is declared more than once",
                    rule.name()
                )));
            }
        }

        let mut targets = HashSet::new();
        for rule in &self.sync_rules {
            if rule.column.trim().is_empty() {
                return Err(VeilError::Configuration(format!(
                    "table '{table}' declares a sync rule without a column"
                )));
            }
            for target in &rule.targets {
                if target.table.trim().is_empty() || target.column.trim().is_empty() {
                    return Err(VeilError::Configuration(format!(
                        "sync rule for '{table}.{}' has an empty target",
                        rule.column
                    )));
                }
                if target.table == table {
                    return Err(VeilError::Configuration(format!(
                        "sync rule for '{table}.{}' targets its own table",
                        rule.column
                    )));
                }
                if !targets.insert(target) {
                    return Err(VeilError::Configuration(format!(
                        "sync target '{}.{}' is declared more than once on table '{table}'",
                        target.table, target.column
                    )));
                }
            }
        }

        Ok(Blueprint {
            table,
            primary_key,
            columns: self.columns,
            global_filters: self.global_filters,
            sync_rules: self.sync_rules,
            active_triggers: Vec::new(),
        })
    }
}

/// Declares one column rule; a replacement call returns to the table builder
#[derive(Debug)]
pub struct ColumnBuilder {
    parent: BlueprintBuilder,
    name: String,
    filter: Option<String>,
}

impl ColumnBuilder {
    /// Only replace the value in rows matching this SQL expression
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Replaces with a fixed value; text may contain `#row#`
    pub fn replace_with(self, value: impl Into<SqlValue>) -> BlueprintBuilder {
        self.replace(Replacement::literal(value))
    }

    /// Replaces with a value produced by the generator
    pub fn replace_with_generated<F>(self, f: F) -> BlueprintBuilder
    where
        F: Fn(&dyn Generator) -> Result<SqlValue> + Send + Sync + 'static,
    {
        self.replace(Replacement::generated(f))
    }

    /// Replaces with a value computed from the row being processed
    pub fn replace_by_fields<F>(self, f: F) -> BlueprintBuilder
    where
        F: Fn(&Row, &dyn Generator) -> Result<SqlValue> + Send + Sync + 'static,
    {
        self.replace(Replacement::derived(f))
    }

    /// Replaces with an explicit strategy
    pub fn replace(self, replacement: Replacement) -> BlueprintBuilder {
        let mut rule = ColumnRule::new(self.name, replacement);
        if let Some(filter) = self.filter {
            rule = rule.with_filter(filter);
        }
        self.parent.rule(rule)
    }
}

/// Declares where a synchronized column's new value is propagated
#[derive(Debug)]
pub struct SyncBuilder {
    parent: BlueprintBuilder,
    column: String,
}

impl SyncBuilder {
    /// Propagates to `table.column`, matching rows on the previous value
    pub fn to(mut self, table: impl Into<String>, column: impl Into<String>) -> BlueprintBuilder {
        self.parent
            .push_sync_target(self.column, SyncTarget::new(table, column));
        self.parent
    }
}
