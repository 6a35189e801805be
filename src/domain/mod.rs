//! Domain types for Veil.
//!
//! The domain layer provides:
//! - **Error types** ([`VeilError`], [`DatabaseError`])
//! - **Result type alias** ([`Result`])
//! - **Values and rows** ([`SqlValue`], [`Row`]) shared by the resolver,
//!   the planner and the database adapters
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, VeilError>`]:
//!
//! ```rust
//! use veil::domain::{Result, SqlValue, VeilError};
//!
//! fn require_text(value: &SqlValue) -> Result<&str> {
//!     value
//!         .as_text()
//!         .ok_or_else(|| VeilError::SchemaMismatch("expected text".to_string()))
//! }
//! ```

pub mod errors;
pub mod result;
pub mod value;

// Re-export commonly used types for convenience
pub use errors::{DatabaseError, VeilError};
pub use result::Result;
pub use value::{escape_string, quote_ident, Row, SqlValue};
