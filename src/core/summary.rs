//! Run summary and reporting
//!
//! This module defines structures for tracking and reporting the outcome of a
//! run, per table and overall.

use crate::core::scheduler::WaveStats;
use std::fmt;
use std::time::Duration;

/// How a run writes its results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// UPDATE statements against the source database
    InPlace,
    /// INSERT statements into a separate target database
    Replication,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::InPlace => write!(f, "in-place"),
            RunMode::Replication => write!(f, "replication"),
        }
    }
}

/// Outcome of processing one table
#[derive(Debug, Clone)]
pub struct TableSummary {
    /// Table name
    pub table: String,

    /// Rows read from the source
    pub rows_read: u64,

    /// UPDATE or INSERT statements executed
    pub statements: u64,

    /// Rows the server reported as affected
    pub rows_affected: u64,

    /// Waves drained by the scheduler
    pub waves: u64,

    /// Sync triggers that were active while the table was processed
    pub triggers: usize,

    /// Wall-clock processing time
    pub duration: Duration,
}

impl TableSummary {
    pub fn new(table: impl Into<String>, stats: WaveStats, duration: Duration) -> Self {
        Self {
            table: table.into(),
            rows_read: stats.rows,
            statements: stats.statements,
            rows_affected: stats.affected,
            waves: stats.waves,
            triggers: 0,
            duration,
        }
    }

    pub fn with_triggers(mut self, triggers: usize) -> Self {
        self.triggers = triggers;
        self
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Write mode of the run
    pub mode: RunMode,

    /// Whether statements were only logged
    pub dry_run: bool,

    /// Per-table outcomes in processing order
    pub tables: Vec<TableSummary>,

    /// Foreign keys re-created on the target (replication only)
    pub constraints_restored: usize,

    /// Total duration of the run
    pub duration: Duration,
}

impl RunSummary {
    /// Create a new empty summary
    pub fn new(mode: RunMode, dry_run: bool) -> Self {
        Self {
            mode,
            dry_run,
            tables: Vec::new(),
            constraints_restored: 0,
            duration: Duration::ZERO,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_read).sum()
    }

    pub fn total_statements(&self) -> u64 {
        self.tables.iter().map(|t| t.statements).sum()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            mode = %self.mode,
            dry_run = self.dry_run,
            tables = self.tables.len(),
            rows = self.total_rows(),
            statements = self.total_statements(),
            constraints_restored = self.constraints_restored,
            duration_ms = self.duration.as_millis() as u64,
            "Anonymization completed"
        );

        for table in &self.tables {
            tracing::debug!(
                table = %table.table,
                rows = table.rows_read,
                statements = table.statements,
                affected = table.rows_affected,
                waves = table.waves,
                triggers = table.triggers,
                duration_ms = table.duration.as_millis() as u64,
                "Table summary"
            );
        }
    }
}
