//! Foreign-key metadata
//!
//! Reads constraint definitions from `information_schema` so they can be
//! stripped from recreated tables and restored once every table is loaded.

use crate::adapters::database::Database;
use crate::core::planner::{Statement, StatementBuilder};
use crate::domain::{quote_ident, Result, Row, SqlValue, VeilError};
use std::collections::BTreeMap;

const FOREIGN_KEYS_QUERY: &str = "SELECT k.CONSTRAINT_NAME AS constraint_name, \
k.TABLE_NAME AS table_name, \
k.COLUMN_NAME AS column_name, \
k.REFERENCED_TABLE_NAME AS referenced_table_name, \
k.REFERENCED_COLUMN_NAME AS referenced_column_name, \
r.UPDATE_RULE AS update_rule, \
r.DELETE_RULE AS delete_rule \
FROM information_schema.KEY_COLUMN_USAGE k \
JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA \
AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
AND r.TABLE_NAME = k.TABLE_NAME \
WHERE k.TABLE_SCHEMA = ";

const FOREIGN_KEYS_ORDER: &str = " AND k.REFERENCED_TABLE_NAME IS NOT NULL \
AND k.REFERENCED_TABLE_SCHEMA = k.TABLE_SCHEMA \
ORDER BY k.TABLE_NAME, k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

/// One foreign-key constraint, possibly spanning several columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub update_rule: String,
    pub delete_rule: String,
}

impl ForeignKey {
    pub fn is_self_reference(&self) -> bool {
        self.table == self.referenced_table
    }

    /// `ALTER TABLE ... ADD CONSTRAINT` re-creating this key as declared
    pub fn add_constraint_sql(&self) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quote_ident(&self.table),
            quote_ident(&self.name),
            ident_list(&self.columns),
            quote_ident(&self.referenced_table),
            ident_list(&self.referenced_columns),
            self.delete_rule,
            self.update_rule,
        )
    }
}

fn ident_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Query listing every same-schema foreign key of `schema`
pub fn foreign_keys_statement(schema: &str) -> Statement {
    let mut builder = StatementBuilder::new();
    builder
        .push(FOREIGN_KEYS_QUERY)
        .push_value(SqlValue::from(schema))
        .push(FOREIGN_KEYS_ORDER);
    builder.build()
}

fn text(row: &Row, column: &str) -> Result<String> {
    match row.get(column) {
        Some(SqlValue::Text(value)) => Ok(value.clone()),
        Some(SqlValue::Bytes(bytes)) => String::from_utf8(bytes.clone()).map_err(|_| {
            VeilError::SchemaMismatch(format!("foreign key metadata '{column}' is not UTF-8"))
        }),
        _ => Err(VeilError::SchemaMismatch(format!(
            "foreign key metadata is missing '{column}'"
        ))),
    }
}

/// Folds `KEY_COLUMN_USAGE` rows (one per column) into constraints
///
/// Rows must be ordered by table, constraint and ordinal position.
pub fn group_foreign_keys(rows: &[Row]) -> Result<Vec<ForeignKey>> {
    let mut keys: BTreeMap<(String, String), ForeignKey> = BTreeMap::new();

    for row in rows {
        let table = text(row, "table_name")?;
        let name = text(row, "constraint_name")?;
        let column = text(row, "column_name")?;
        let referenced_column = text(row, "referenced_column_name")?;

        match keys.get_mut(&(table.clone(), name.clone())) {
            Some(key) => {
                key.columns.push(column);
                key.referenced_columns.push(referenced_column);
            }
            None => {
                let key = ForeignKey {
                    name: name.clone(),
                    table: table.clone(),
                    columns: vec![column],
                    referenced_table: text(row, "referenced_table_name")?,
                    referenced_columns: vec![referenced_column],
                    update_rule: text(row, "update_rule")?,
                    delete_rule: text(row, "delete_rule")?,
                };
                keys.insert((table, name), key);
            }
        }
    }

    Ok(keys.into_values().collect())
}

/// Foreign keys whose owning and referenced tables are both in `tables`
///
/// Self-references are included.
///
/// # Errors
///
/// Returns a database error if the metadata query fails and
/// [`VeilError::SchemaMismatch`] if its rows are malformed.
pub async fn list_foreign_keys(db: &dyn Database, tables: &[String]) -> Result<Vec<ForeignKey>> {
    let rows = db
        .fetch_all(&foreign_keys_statement(db.database_name()))
        .await?;
    let keys = group_foreign_keys(&rows)?;
    Ok(keys
        .into_iter()
        .filter(|k| tables.contains(&k.table) && tables.contains(&k.referenced_table))
        .collect())
}
