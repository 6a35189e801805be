//! Database abstraction layer
//!
//! This module provides a trait-based abstraction for database operations so
//! the engine can run against MySQL, a dry-run decorator, or a test double.

pub mod dry_run;
pub mod factory;
pub mod traits;

pub use dry_run::DryRunDatabase;
pub use factory::create_database;
pub use traits::Database;
