//! External system integrations for Veil.
//!
//! - [`database`] - Database abstraction layer (trait-based) and the dry-run decorator
//! - [`mysql`] - MySQL implementation backed by a `sqlx` pool
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with mock implementations. The engine only ever talks to
//! `Arc<dyn Database>`.
//!
//! ```rust,no_run
//! use veil::adapters::database::create_database;
//! use veil::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("veil.toml")?;
//! let source = create_database(&config.source, config.application.dry_run).await?;
//! source.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod mysql;
