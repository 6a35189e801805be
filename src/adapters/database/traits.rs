//! Database abstraction traits
//!
//! This module defines the capability the engine consumes from a database
//! driver: streaming reads, single-statement writes and raw DDL.

use crate::core::planner::Statement;
use crate::domain::{Result, Row};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Database client trait
///
/// Implementations must be shareable across the concurrently in-flight
/// statements of a wave.
#[async_trait]
pub trait Database: Send + Sync {
    /// Name of the schema this client is connected to
    fn database_name(&self) -> &str;

    /// Test the database connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Streams the rows of a query in the order the server returns them
    fn stream<'a>(&'a self, statement: &'a Statement) -> BoxStream<'a, Result<Row>>;

    /// Runs a query and collects every row
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a value cannot be decoded.
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Executes a data-modifying statement, returning the affected row count
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the statement.
    async fn execute(&self, statement: &Statement) -> Result<u64>;

    /// Executes SQL that cannot be prepared (trigger DDL, `SET` statements)
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the statement.
    async fn execute_raw(&self, sql: &str) -> Result<()>;

    /// Disables foreign-key checking for every connection this client uses
    ///
    /// # Errors
    ///
    /// Returns an error if the setting cannot be applied.
    async fn disable_foreign_key_checks(&self) -> Result<()>;
}
