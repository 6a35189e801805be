//! Dry-run decorator
//!
//! Forwards reads to the wrapped database and only logs writes and DDL, so a
//! run can be previewed end to end without changing anything.

use super::Database;
use crate::core::planner::Statement;
use crate::domain::{Result, Row};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Read-through, write-nothing wrapper around a [`Database`]
pub struct DryRunDatabase {
    inner: Arc<dyn Database>,
    skipped: AtomicU64,
}

impl DryRunDatabase {
    pub fn new(inner: Arc<dyn Database>) -> Self {
        Self {
            inner,
            skipped: AtomicU64::new(0),
        }
    }

    /// Number of writes and DDL statements that were not executed
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Database for DryRunDatabase {
    fn database_name(&self) -> &str {
        self.inner.database_name()
    }

    async fn test_connection(&self) -> Result<()> {
        self.inner.test_connection().await
    }

    fn stream<'a>(&'a self, statement: &'a Statement) -> BoxStream<'a, Result<Row>> {
        self.inner.stream(statement)
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.inner.fetch_all(statement).await
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            database = %self.inner.database_name(),
            statement = %statement.text(),
            "DRY RUN: Would execute statement"
        );
        Ok(0)
    }

    async fn execute_raw(&self, sql: &str) -> Result<()> {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            database = %self.inner.database_name(),
            statement = %sql,
            "DRY RUN: Would execute DDL"
        );
        Ok(())
    }

    async fn disable_foreign_key_checks(&self) -> Result<()> {
        tracing::info!(
            database = %self.inner.database_name(),
            "DRY RUN: Would disable foreign key checks"
        );
        Ok(())
    }
}
