//! Value resolution
//!
//! Turns a [`ColumnRule`] plus the row being processed into the value written
//! back to the database.

use crate::blueprint::{Blueprint, ColumnRule, Replacement};
use crate::domain::{Result, Row, SqlValue, VeilError};
use crate::generator::{Generator, Unavailable};

/// Token replaced with the row's zero-based fetch position
pub const ROW_PLACEHOLDER: &str = "#row#";

/// Resolves one rule
///
/// Derived values are written into `working` so that later rules of the same
/// row see them. Text results have every [`ROW_PLACEHOLDER`] replaced with
/// `row_index`; other values pass through untouched.
///
/// # Errors
///
/// Returns [`VeilError::GeneratorRequired`] for a generated rule when
/// `generator` is `None`, and propagates callback errors.
pub fn resolve(
    rule: &ColumnRule,
    working: &mut Row,
    row_index: u64,
    generator: Option<&dyn Generator>,
) -> Result<SqlValue> {
    let value = match rule.replacement() {
        Replacement::DerivedFromRow(derive) => {
            let generator = generator.unwrap_or(&Unavailable as &dyn Generator);
            derive(&*working, generator)?
        }
        Replacement::Generated(generate) => match generator {
            Some(generator) => generate(generator)?,
            None => {
                return Err(VeilError::GeneratorRequired(format!(
                    "column '{}' uses a generated value but no generator is configured",
                    rule.name()
                )))
            }
        },
        Replacement::Literal(value) => value.clone(),
    };

    let value = substitute_row_index(value, row_index);
    if rule.replacement().needs_full_row() {
        working.insert(rule.name(), value.clone());
    }
    Ok(value)
}

/// Replaces the row placeholder in textual values
pub fn substitute_row_index(value: SqlValue, row_index: u64) -> SqlValue {
    match value {
        SqlValue::Text(text) if text.contains(ROW_PLACEHOLDER) => {
            SqlValue::Text(text.replace(ROW_PLACEHOLDER, &row_index.to_string()))
        }
        other => other,
    }
}

/// Resolves every rule of a blueprint for one row, in declaration order
///
/// Rules for which `skip` returns true keep no value; the caller copies the
/// original instead.
pub fn resolve_row<F>(
    blueprint: &Blueprint,
    row: &Row,
    row_index: u64,
    generator: Option<&dyn Generator>,
    skip: F,
) -> Result<Vec<(usize, Option<SqlValue>)>>
where
    F: Fn(usize, &ColumnRule) -> bool,
{
    let mut working = row.clone();
    blueprint
        .columns()
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            if skip(i, rule) {
                Ok((i, None))
            } else {
                resolve(rule, &mut working, row_index, generator).map(|v| (i, Some(v)))
            }
        })
        .collect()
}
