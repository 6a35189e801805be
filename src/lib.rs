// Veil - MySQL data anonymizer
// Copyright (c) 2025 Veil Contributors
// Licensed under the MIT License

//! # Veil - MySQL data anonymizer
//!
//! Veil rewrites sensitive columns of MySQL tables with fixed, generated or
//! row-derived values, either in place or while replicating the tables into a
//! separate database.
//!
//! ## Overview
//!
//! - **Blueprints** declare, per table, which columns are replaced, which rows
//!   are touched and which other tables must follow a replaced value
//! - **Planning** turns each fetched row into one parameterized UPDATE or
//!   INSERT statement
//! - **Scheduling** executes statements in waves of bounded size
//! - **Synchronization** installs temporary triggers that propagate replaced
//!   values into dependent tables
//! - **Replication** recreates tables on a target, copies anonymized rows and
//!   restores foreign keys afterwards
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Resolution, planning, scheduling, synchronization, replication
//! - [`blueprint`] - Per-table rule sets and their declaration
//! - [`generator`] - Fake value generation
//! - [`adapters`] - Database access (MySQL, dry run)
//! - [`domain`] - Errors, values and rows
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use veil::adapters::database::create_database;
//! use veil::config::load_config;
//! use veil::core::anonymizer::{Anonymizer, AnonymizerSettings};
//! use veil::domain::SqlValue;
//! use veil::generator::FakeGenerator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("veil.toml")?;
//!     let source = create_database(&config.source, false).await?;
//!
//!     let mut anonymizer = Anonymizer::new(source, AnonymizerSettings::default())
//!         .with_generator(Arc::new(FakeGenerator::new(config.anonymizer.locale())));
//!
//!     anonymizer.table("users", |t| {
//!         t.column("email")
//!             .filter("id != 1")
//!             .replace_with("user_#row#@example.com")
//!             .column("last_name")
//!             .replace_with_generated(|g| g.generate("last_name"))
//!             .column("nickname")
//!             .replace_by_fields(|row, _| {
//!                 Ok(row.get("first_name").cloned().unwrap_or(SqlValue::Null))
//!             })
//!             .sync("email")
//!             .to("orders", "customer_email")
//!     })?;
//!
//!     let summary = anonymizer.run().await?;
//!     println!("Anonymized {} rows", summary.total_rows());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::VeilError`]. Runs fail fast: the
//! first failing statement aborts the run and nothing is retried.

pub mod adapters;
pub mod blueprint;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod generator;
pub mod logging;
