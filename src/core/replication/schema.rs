//! Table definitions for the replication target

use crate::adapters::database::Database;
use crate::core::planner::{Statement, StatementBuilder};
use crate::domain::{quote_ident, Result, SqlValue, VeilError};

const GENERATED_COLUMNS_QUERY: &str = "SELECT COLUMN_NAME AS column_name \
     FROM information_schema.COLUMNS WHERE TABLE_SCHEMA = ";

/// Fetches the `CREATE TABLE` statement of `table`
///
/// # Errors
///
/// Returns [`VeilError::SchemaMismatch`] if the server does not describe
/// `table` as a base table.
pub async fn show_create_table(db: &dyn Database, table: &str) -> Result<String> {
    let statement = Statement::raw(format!("SHOW CREATE TABLE {}", quote_ident(table)));
    let rows = db.fetch_all(&statement).await?;
    let row = rows.first().ok_or_else(|| {
        VeilError::SchemaMismatch(format!("SHOW CREATE TABLE returned nothing for '{table}'"))
    })?;

    match row.get("Create Table") {
        Some(SqlValue::Text(sql)) => Ok(sql.clone()),
        Some(SqlValue::Bytes(bytes)) => String::from_utf8(bytes.clone()).map_err(|_| {
            VeilError::SchemaMismatch(format!("definition of '{table}' is not UTF-8"))
        }),
        _ => Err(VeilError::SchemaMismatch(format!(
            "'{table}' is not a base table"
        ))),
    }
}

/// Query listing the `VIRTUAL`/`STORED` generated columns of `table`
pub fn generated_columns_statement(schema: &str, table: &str) -> Statement {
    let mut builder = StatementBuilder::new();
    builder
        .push(GENERATED_COLUMNS_QUERY)
        .push_value(SqlValue::from(schema))
        .push(" AND TABLE_NAME = ")
        .push_value(SqlValue::from(table))
        .push(" AND EXTRA IN ('VIRTUAL GENERATED', 'STORED GENERATED') ORDER BY ORDINAL_POSITION");
    builder.build()
}

/// Columns of `table` whose value the server computes
///
/// The server rejects explicit values for them, so copies leave them out.
pub async fn list_generated_columns(db: &dyn Database, table: &str) -> Result<Vec<String>> {
    let rows = db
        .fetch_all(&generated_columns_statement(db.database_name(), table))
        .await?;
    rows.iter()
        .map(|row| match row.get("column_name") {
            Some(SqlValue::Text(name)) => Ok(name.clone()),
            Some(SqlValue::Bytes(bytes)) => String::from_utf8(bytes.clone()).map_err(|_| {
                VeilError::SchemaMismatch(format!("column name in '{table}' is not UTF-8"))
            }),
            _ => Err(VeilError::SchemaMismatch(format!(
                "column metadata of '{table}' is missing 'column_name'"
            ))),
        })
        .collect()
}

/// Removes the named `CONSTRAINT ... FOREIGN KEY` clauses from a definition
///
/// Clauses are matched by their literal text as printed by
/// `SHOW CREATE TABLE` (one clause per line). Trailing commas of the
/// remaining clauses are rewritten so the statement stays valid.
///
/// # Errors
///
/// Returns [`VeilError::SchemaMismatch`] if a named constraint does not
/// appear in the definition.
pub fn strip_foreign_keys(create_sql: &str, constraints: &[&str]) -> Result<String> {
    if constraints.is_empty() {
        return Ok(create_sql.to_string());
    }

    let lines: Vec<&str> = create_sql.lines().collect();
    let open = lines
        .iter()
        .position(|line| line.trim_end().ends_with('('))
        .ok_or_else(|| VeilError::SchemaMismatch("unrecognized CREATE TABLE layout".to_string()))?;
    let close = lines
        .iter()
        .rposition(|line| line.starts_with(')'))
        .filter(|close| *close > open)
        .ok_or_else(|| VeilError::SchemaMismatch("unrecognized CREATE TABLE layout".to_string()))?;

    let prefixes: Vec<String> = constraints
        .iter()
        .map(|name| format!("CONSTRAINT {} FOREIGN KEY", quote_ident(name)))
        .collect();
    let mut found = vec![false; constraints.len()];

    let mut body = Vec::new();
    for line in &lines[open + 1..close] {
        let trimmed = line.trim_start();
        match prefixes.iter().position(|p| trimmed.starts_with(p.as_str())) {
            Some(i) => found[i] = true,
            None => body.push(line.trim_end().trim_end_matches(',')),
        }
    }

    if let Some(i) = found.iter().position(|f| !f) {
        return Err(VeilError::SchemaMismatch(format!(
            "constraint '{}' not found in table definition",
            constraints[i]
        )));
    }

    let mut out: Vec<String> = lines[..=open].iter().map(|l| l.to_string()).collect();
    let last = body.len().saturating_sub(1);
    for (i, line) in body.iter().enumerate() {
        if i < last {
            out.push(format!("{line},"));
        } else {
            out.push(line.to_string());
        }
    }
    out.extend(lines[close..].iter().map(|l| l.to_string()));
    Ok(out.join("\n"))
}
