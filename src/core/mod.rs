//! Core business logic for Veil.
//!
//! # Modules
//!
//! - [`resolve`] - Value resolution for one column of one row
//! - [`planner`] - SELECT, UPDATE and INSERT planning
//! - [`scheduler`] - Wave-gated execution of planned statements
//! - [`sync`] - Trigger-based propagation of anonymized values
//! - [`replication`] - Copying anonymized tables into a target database
//! - [`anonymizer`] - Blueprint registry and run orchestration
//! - [`summary`] - Run reporting
//!
//! # Workflow
//!
//! 1. **Declare**: Register one blueprint per table
//! 2. **Install**: Create sync triggers for the table (in-place mode)
//! 3. **Stream**: Read the table's rows through a single cursor
//! 4. **Plan**: Resolve each row's replacement values into a statement
//! 5. **Execute**: Run statements in waves of `max_in_flight`
//! 6. **Teardown**: Drop the table's sync triggers
//! 7. **Restore**: Re-add foreign keys on the target (replication mode)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use veil::adapters::database::create_database;
//! use veil::config::load_config;
//! use veil::core::anonymizer::{Anonymizer, AnonymizerSettings};
//! use veil::generator::FakeGenerator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("veil.toml")?;
//! let source = create_database(&config.source, false).await?;
//!
//! let mut anonymizer = Anonymizer::new(source, AnonymizerSettings::from(&config.anonymizer))
//!     .with_generator(Arc::new(FakeGenerator::new(config.anonymizer.locale())));
//! anonymizer.declare_tables(&config.tables)?;
//!
//! let summary = anonymizer.run().await?;
//! println!("Rows: {}", summary.total_rows());
//! # Ok(())
//! # }
//! ```

pub mod anonymizer;
pub mod planner;
pub mod replication;
pub mod resolve;
pub mod scheduler;
pub mod summary;
pub mod sync;
