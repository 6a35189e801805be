//! Wave-gated statement scheduler
//!
//! Drives one read cursor to completion, planning one statement per row.
//! Each statement starts executing as soon as it is submitted, while the
//! cursor keeps being read. Once `max_in_flight` statements have been
//! submitted in the current wave, the cursor is paused until every one of
//! them has completed; only then does the next wave begin. A single slow
//! statement therefore stalls the whole wave; the first failing statement
//! aborts the run and the rest of its wave is dropped.

use crate::adapters::database::Database;
use crate::core::planner::Statement;
use crate::domain::{Result, Row};
use crate::log_wave_drained;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, FuturesUnordered, StreamExt};

type InFlight<'a> = FuturesUnordered<BoxFuture<'a, Result<u64>>>;

/// Counters for one driven cursor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveStats {
    /// Rows read from the cursor
    pub rows: u64,
    /// Statements executed
    pub statements: u64,
    /// Waves drained
    pub waves: u64,
    /// Rows reported affected by the database
    pub affected: u64,
}

/// Bounded, wave-gated executor
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    max_in_flight: usize,
}

impl Scheduler {
    /// Creates a scheduler; a ceiling of zero is treated as one
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Reads `rows` to completion and executes the planned statements on `sink`
    ///
    /// `plan` receives each row with its zero-based fetch position and may
    /// return `None` to skip the row.
    ///
    /// # Errors
    ///
    /// Returns the first read, planning or execution error.
    pub async fn run<'a, F>(
        &self,
        table: &str,
        mut rows: BoxStream<'a, Result<Row>>,
        sink: &'a dyn Database,
        mut plan: F,
    ) -> Result<WaveStats>
    where
        F: FnMut(&Row, u64) -> Result<Option<Statement>>,
    {
        let mut stats = WaveStats::default();
        let mut in_flight: InFlight<'a> = FuturesUnordered::new();
        // Statements admitted to the current wave, finished or not
        let mut admitted = 0usize;

        loop {
            tokio::select! {
                Some(result) = in_flight.next(), if !in_flight.is_empty() => {
                    stats.affected += result?;
                }
                row = rows.next() => {
                    let Some(row) = row else {
                        break;
                    };
                    let row = row?;
                    let index = stats.rows;
                    stats.rows += 1;

                    let Some(statement) = plan(&row, index)? else {
                        continue;
                    };
                    in_flight.push(Box::pin(async move { sink.execute(&statement).await }));
                    stats.statements += 1;
                    admitted += 1;

                    if admitted >= self.max_in_flight {
                        drain(table, &mut in_flight, admitted, &mut stats).await?;
                        admitted = 0;
                    }
                }
            }
        }

        if admitted > 0 {
            drain(table, &mut in_flight, admitted, &mut stats).await?;
        }

        Ok(stats)
    }
}

async fn drain(
    table: &str,
    in_flight: &mut InFlight<'_>,
    size: usize,
    stats: &mut WaveStats,
) -> Result<()> {
    while let Some(result) = in_flight.next().await {
        stats.affected += result?;
    }
    stats.waves += 1;
    log_wave_drained!(table, stats.waves, size);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ceiling_is_one() {
        assert_eq!(Scheduler::new(0).max_in_flight(), 1);
        assert_eq!(Scheduler::new(25).max_in_flight(), 25);
    }
}
