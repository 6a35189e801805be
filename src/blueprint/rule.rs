//! Column rules and replacement strategies

use crate::domain::{Result, Row, SqlValue};
use crate::generator::Generator;
use std::fmt;
use std::sync::Arc;

/// Callback producing a value from the generator
pub type GeneratedFn = Arc<dyn Fn(&dyn Generator) -> Result<SqlValue> + Send + Sync>;

/// Callback producing a value from the current row and the generator
pub type DerivedFn = Arc<dyn Fn(&Row, &dyn Generator) -> Result<SqlValue> + Send + Sync>;

/// How a column's new value is obtained
#[derive(Clone)]
pub enum Replacement {
    /// A fixed value; text may contain the `#row#` placeholder
    Literal(SqlValue),
    /// A value produced by the generator
    Generated(GeneratedFn),
    /// A value computed from the row being processed
    DerivedFromRow(DerivedFn),
}

impl Replacement {
    /// Creates a literal replacement
    pub fn literal(value: impl Into<SqlValue>) -> Self {
        Replacement::Literal(value.into())
    }

    /// Creates a generator-driven replacement
    pub fn generated<F>(f: F) -> Self
    where
        F: Fn(&dyn Generator) -> Result<SqlValue> + Send + Sync + 'static,
    {
        Replacement::Generated(Arc::new(f))
    }

    /// Creates a row-derived replacement
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&Row, &dyn Generator) -> Result<SqlValue> + Send + Sync + 'static,
    {
        Replacement::DerivedFromRow(Arc::new(f))
    }

    /// Returns true if resolving this replacement needs the whole row
    pub fn needs_full_row(&self) -> bool {
        matches!(self, Replacement::DerivedFromRow(_))
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Replacement::Generated(_) => f.write_str("Generated(..)"),
            Replacement::DerivedFromRow(_) => f.write_str("DerivedFromRow(..)"),
        }
    }
}

/// A per-column replacement rule
#[derive(Debug, Clone)]
pub struct ColumnRule {
    name: String,
    filter: Option<String>,
    replacement: Replacement,
}

impl ColumnRule {
    /// Creates a rule replacing `name` unconditionally
    pub fn new(name: impl Into<String>, replacement: Replacement) -> Self {
        Self {
            name: name.into(),
            filter: None,
            replacement,
        }
    }

    /// Restricts the rule to rows matching a SQL boolean expression
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row filter, if any
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Replacement strategy
    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builder() {
        let rule = ColumnRule::new("email", Replacement::literal("x@example.com"))
            .with_filter("id != 1");
        assert_eq!(rule.name(), "email");
        assert_eq!(rule.filter(), Some("id != 1"));
        assert!(!rule.replacement().needs_full_row());
    }

    #[test]
    fn test_derived_needs_full_row() {
        let rule = Replacement::derived(|row, _| Ok(row.get("id").cloned().unwrap_or_default()));
        assert!(rule.needs_full_row());
        assert_eq!(format!("{rule:?}"), "DerivedFromRow(..)");
    }
}
