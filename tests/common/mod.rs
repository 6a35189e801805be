//! Shared test helpers: a scripted, recording in-memory database

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use veil::adapters::database::Database;
use veil::core::planner::Statement;
use veil::domain::{DatabaseError, Result, Row};

/// In-memory [`Database`] double
///
/// Reads return the rows scripted for the first fragment found in the
/// statement text. Every write, prepared or raw, is appended to one ordered
/// log so tests can assert on the interleaving of DDL and DML.
pub struct MockDatabase {
    name: String,
    scripts: Mutex<Vec<(String, Vec<Row>)>>,
    writes: Mutex<Vec<String>>,
    statements: Mutex<Vec<Statement>>,
    fail_on: Mutex<Option<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    foreign_key_checks_disabled: AtomicBool,
    delay: Duration,
}

impl MockDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scripts: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            statements: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            foreign_key_checks_disabled: AtomicBool::new(false),
            delay: Duration::from_millis(5),
        }
    }

    /// Rows returned by reads whose text contains `fragment`
    pub fn on_query(self, fragment: &str, rows: Vec<Row>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push((fragment.to_string(), rows));
        self
    }

    /// Makes every write whose text contains `fragment` fail
    pub fn fail_on(self, fragment: &str) -> Self {
        *self.fail_on.lock().unwrap() = Some(fragment.to_string());
        self
    }

    /// Makes later writes whose text contains `fragment` fail
    pub fn start_failing_on(&self, fragment: &str) {
        *self.fail_on.lock().unwrap() = Some(fragment.to_string());
    }

    /// Text of every write, in issue order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Prepared statements executed, in issue order
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    /// Position of the first write containing `fragment`
    pub fn position(&self, fragment: &str) -> Option<usize> {
        self.writes().iter().position(|w| w.contains(fragment))
    }

    /// Position of the last write containing `fragment`
    pub fn last_position(&self, fragment: &str) -> Option<usize> {
        self.writes().iter().rposition(|w| w.contains(fragment))
    }

    /// Highest number of concurrently executing statements observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn foreign_key_checks_disabled(&self) -> bool {
        self.foreign_key_checks_disabled.load(Ordering::SeqCst)
    }

    fn rows_for(&self, text: &str) -> Vec<Row> {
        self.scripts
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| text.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }

    fn check_failure(&self, text: &str) -> Result<()> {
        match self.fail_on.lock().unwrap().as_deref() {
            Some(fragment) if text.contains(fragment) => {
                Err(DatabaseError::query_failed(text, "scripted failure").into())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Database for MockDatabase {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn stream<'a>(&'a self, statement: &'a Statement) -> BoxStream<'a, Result<Row>> {
        let rows = self.rows_for(statement.text());
        stream::iter(rows.into_iter().map(Ok)).boxed()
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>> {
        Ok(self.rows_for(statement.text()))
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.check_failure(statement.text())?;
        self.writes
            .lock()
            .unwrap()
            .push(statement.text().to_string());
        self.statements.lock().unwrap().push(statement.clone());
        Ok(1)
    }

    async fn execute_raw(&self, sql: &str) -> Result<()> {
        self.check_failure(sql)?;
        self.writes.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn disable_foreign_key_checks(&self) -> Result<()> {
        self.foreign_key_checks_disabled.store(true, Ordering::SeqCst);
        self.writes
            .lock()
            .unwrap()
            .push("SET FOREIGN_KEY_CHECKS=0".to_string());
        Ok(())
    }
}

/// `users` rows with ids `1..=count`
pub fn users(count: i64) -> Vec<Row> {
    (1..=count)
        .map(|id| {
            Row::new()
                .with("id", id)
                .with("email", format!("person{id}@corp.example"))
                .with("first_name", format!("First{id}"))
                .with("last_name", format!("Last{id}"))
        })
        .collect()
}
