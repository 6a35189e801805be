//! Mutation planner
//!
//! Builds the SELECT that feeds a table's row loop and the per-row UPDATE
//! (in-place mode) or INSERT (replication mode).
//!
//! Values are always bound as `?` parameters. Each [`Statement`] additionally
//! carries a rendered text form with the values inlined as escaped literals,
//! used for dry runs and trace logs. Table and column names are quoted
//! identifiers; filter expressions come from the operator and are inserted
//! verbatim.

use super::resolve::resolve_row;
use crate::blueprint::Blueprint;
use crate::domain::{quote_ident, Result, Row, SqlValue, VeilError};
use crate::generator::Generator;
use std::fmt;

/// Prefix of the select aliases carrying evaluated row filters in copy reads
pub const FILTER_ALIAS_PREFIX: &str = "__veil_filter_";

/// A SQL statement with bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
    text: String,
}

impl Statement {
    /// A statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            text: sql.clone(),
            sql,
            params: Vec::new(),
        }
    }

    /// SQL with `?` placeholders
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Values bound to the placeholders, in order
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// SQL with the values rendered as literals
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Assembles a [`Statement`] fragment by fragment
#[derive(Debug, Default)]
pub struct StatementBuilder {
    sql: String,
    params: Vec<SqlValue>,
    text: String,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends trusted SQL
    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self.text.push_str(fragment);
        self
    }

    /// Appends a quoted identifier
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        let quoted = quote_ident(name);
        self.push(&quoted)
    }

    /// Appends a bound value
    pub fn push_value(&mut self, value: SqlValue) -> &mut Self {
        self.sql.push('?');
        self.text.push_str(&value.to_sql_literal());
        self.params.push(value);
        self
    }

    pub fn build(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            text: self.text,
        }
    }
}

/// Alias of the select column carrying the filter of the rule at `index`
pub fn filter_alias(index: usize) -> String {
    format!("{FILTER_ALIAS_PREFIX}{index}")
}

fn push_where(builder: &mut StatementBuilder, blueprint: &Blueprint) {
    if let Some(filter) = blueprint.global_filter() {
        builder.push(" WHERE ").push(&filter);
    }
}

/// Plans the read feeding the update loop
///
/// Selects the primary key and every rule column, or `*` when `full_row` is
/// set or any rule derives from the whole row.
pub fn plan_select(blueprint: &Blueprint, full_row: bool) -> Statement {
    let mut builder = StatementBuilder::new();
    builder.push("SELECT ");

    if full_row || blueprint.needs_full_row() {
        builder.push("*");
    } else {
        let mut columns: Vec<&str> = blueprint.primary_key().iter().map(String::as_str).collect();
        for rule in blueprint.columns() {
            if !columns.contains(&rule.name()) {
                columns.push(rule.name());
            }
        }
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push_ident(column);
        }
    }

    builder.push(" FROM ").push_ident(blueprint.table());
    push_where(&mut builder, blueprint);
    builder.build()
}

/// Plans the read feeding the replication copy
///
/// Selects the whole row plus, for every filtered rule, the filter evaluated
/// against the source row under [`filter_alias`].
pub fn plan_copy_select(blueprint: &Blueprint) -> Statement {
    let mut builder = StatementBuilder::new();
    builder.push("SELECT *");
    for (i, rule) in blueprint.columns().iter().enumerate() {
        if let Some(filter) = rule.filter() {
            builder
                .push(", (")
                .push(filter)
                .push(") AS ")
                .push_ident(&filter_alias(i));
        }
    }
    builder.push(" FROM ").push_ident(blueprint.table());
    push_where(&mut builder, blueprint);
    builder.build()
}

/// Plans the UPDATE for one fetched row
///
/// Returns `None` when the blueprint has no column rules. Filtered rules are
/// wrapped in `CASE WHEN <filter> THEN <value> ELSE <column> END` so the
/// database decides per row; the WHERE clause matches the row's current
/// primary-key values.
///
/// # Errors
///
/// Returns [`VeilError::SchemaMismatch`] if the row lacks a primary-key
/// column, and propagates resolution errors.
pub fn plan_update(
    blueprint: &Blueprint,
    row: &Row,
    row_index: u64,
    generator: Option<&dyn Generator>,
) -> Result<Option<Statement>> {
    if blueprint.columns().is_empty() {
        return Ok(None);
    }

    let resolved = resolve_row(blueprint, row, row_index, generator, |_, _| false)?;

    let mut builder = StatementBuilder::new();
    builder
        .push("UPDATE ")
        .push_ident(blueprint.table())
        .push(" SET ");

    for (i, value) in resolved {
        let rule = &blueprint.columns()[i];
        let value = value.unwrap_or_default();
        if i > 0 {
            builder.push(", ");
        }
        builder.push_ident(rule.name()).push(" = ");
        match rule.filter() {
            Some(filter) => {
                builder
                    .push("(CASE WHEN ")
                    .push(filter)
                    .push(" THEN ")
                    .push_value(value)
                    .push(" ELSE ")
                    .push_ident(rule.name())
                    .push(" END)");
            }
            None => {
                builder.push_value(value);
            }
        }
    }

    builder.push(" WHERE ");
    for (i, column) in blueprint.primary_key().iter().enumerate() {
        let current = row.get(column).ok_or_else(|| {
            VeilError::SchemaMismatch(format!(
                "row of '{}' is missing primary key column '{column}'",
                blueprint.table()
            ))
        })?;
        if i > 0 {
            builder.push(" AND ");
        }
        builder
            .push_ident(column)
            .push(" = ")
            .push_value(current.clone());
    }

    Ok(Some(builder.build()))
}

fn is_truthy(value: &SqlValue) -> bool {
    match value {
        SqlValue::Null | SqlValue::Bytes(_) => false,
        SqlValue::Int(v) => *v != 0,
        SqlValue::UInt(v) => *v != 0,
        SqlValue::Float(v) => *v != 0.0,
        SqlValue::Text(s) => s.trim().parse::<f64>().map(|v| v != 0.0).unwrap_or(false),
    }
}

/// Plans the INSERT copying one fetched row into the target
///
/// Rule columns come first, in declaration order; every other column of the
/// row follows as-is, `NULL` staying SQL `NULL`. A filtered rule whose filter
/// was false for this row copies the original value. Columns named in
/// `generated` are computed by the server and left out. `row` must come from
/// [`plan_copy_select`].
///
/// # Errors
///
/// Returns [`VeilError::SchemaMismatch`] if an evaluated filter is missing
/// from the row, and propagates resolution errors.
pub fn plan_insert(
    blueprint: &Blueprint,
    row: &Row,
    row_index: u64,
    generator: Option<&dyn Generator>,
    generated: &[String],
) -> Result<Statement> {
    let mut flags = Vec::with_capacity(blueprint.columns().len());
    for (i, rule) in blueprint.columns().iter().enumerate() {
        let applies = match rule.filter() {
            Some(_) => {
                let alias = filter_alias(i);
                let flag = row.get(&alias).ok_or_else(|| {
                    VeilError::SchemaMismatch(format!(
                        "row of '{}' lacks evaluated filter for column '{}'",
                        blueprint.table(),
                        rule.name()
                    ))
                })?;
                is_truthy(flag)
            }
            None => true,
        };
        flags.push(applies);
    }

    let data: Row = row
        .iter()
        .filter(|(column, _)| {
            !column.starts_with(FILTER_ALIAS_PREFIX) && !generated.iter().any(|g| g == column)
        })
        .map(|(column, value)| (column, value.clone()))
        .collect();

    let resolved = resolve_row(blueprint, &data, row_index, generator, |i, _| !flags[i])?;

    let mut builder = StatementBuilder::new();
    builder
        .push("INSERT INTO ")
        .push_ident(blueprint.table())
        .push(" SET ");

    let mut first = true;
    for (i, value) in resolved {
        let rule = &blueprint.columns()[i];
        let value = match value {
            Some(value) => value,
            None => data.get(rule.name()).cloned().unwrap_or_default(),
        };
        if !first {
            builder.push(", ");
        }
        first = false;
        builder.push_ident(rule.name()).push(" = ").push_value(value);
    }

    for (column, value) in data.iter() {
        if blueprint.column(column).is_some() {
            continue;
        }
        if !first {
            builder.push(", ");
        }
        first = false;
        builder.push_ident(column).push(" = ").push_value(value.clone());
    }

    Ok(builder.build())
}
