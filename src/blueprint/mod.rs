//! Blueprint model
//!
//! A [`Blueprint`] is the per-table anonymization rule set: which columns are
//! replaced and how, which rows are processed at all, and which other tables
//! must follow a column's new value while the run is in progress.
//!
//! Blueprints are declared through [`BlueprintBuilder`] (programmatically) or
//! [`declaration`] (from the TOML configuration), built exactly once, and are
//! read-only afterwards. The only field mutated during a run is the list of
//! installed triggers, owned by [`crate::core::sync`].

pub mod builder;
pub mod declaration;
pub mod rule;

pub use builder::{BlueprintBuilder, ColumnBuilder, SyncBuilder};
pub use rule::{ColumnRule, DerivedFn, GeneratedFn, Replacement};

/// Table and column receiving a synchronized value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncTarget {
    pub table: String,
    pub column: String,
}

impl SyncTarget {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Propagation of one anonymized column to columns in other tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRule {
    pub column: String,
    pub targets: Vec<SyncTarget>,
}

/// Built, read-only rule set for one table
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub(crate) table: String,
    pub(crate) primary_key: Vec<String>,
    pub(crate) columns: Vec<ColumnRule>,
    pub(crate) global_filters: Vec<String>,
    pub(crate) sync_rules: Vec<SyncRule>,
    pub(crate) active_triggers: Vec<String>,
}

impl Blueprint {
    /// Starts declaring a blueprint for `table`
    pub fn builder(table: impl Into<String>) -> BlueprintBuilder {
        BlueprintBuilder::new(table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Column rules in declaration order
    pub fn columns(&self) -> &[ColumnRule] {
        &self.columns
    }

    /// Returns the rule for a column, if declared
    pub fn column(&self, name: &str) -> Option<&ColumnRule> {
        self.columns.iter().find(|rule| rule.name() == name)
    }

    /// Global row filter; several declared filters are combined with `AND`
    pub fn global_filter(&self) -> Option<String> {
        match self.global_filters.len() {
            0 => None,
            1 => Some(self.global_filters[0].clone()),
            _ => Some(
                self.global_filters
                    .iter()
                    .map(|f| format!("({f})"))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }

    pub fn sync_rules(&self) -> &[SyncRule] {
        &self.sync_rules
    }

    /// Triggers currently installed for this table
    pub fn active_triggers(&self) -> &[String] {
        &self.active_triggers
    }

    /// Returns true if any rule derives its value from the whole row
    pub fn needs_full_row(&self) -> bool {
        self.columns
            .iter()
            .any(|rule| rule.replacement().needs_full_row())
    }

    /// Returns true if `column` is part of the primary key
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }
}
