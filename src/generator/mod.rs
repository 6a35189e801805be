//! Value generators
//!
//! A generator is an opaque capability that produces typed fake values by
//! name (`"email"`, `"first_name"`, ...). The engine never inspects how a
//! value is produced; it only invokes the generator from
//! [`Replacement::Generated`](crate::blueprint::Replacement::Generated) and
//! [`Replacement::DerivedFromRow`](crate::blueprint::Replacement::DerivedFromRow)
//! rules.
//!
//! [`FakeGenerator`] is the bundled implementation, backed by the `fake` crate.

pub mod faker;
pub mod locales;

pub use faker::FakeGenerator;
pub use locales::Locale;

use crate::domain::{Result, SqlValue, VeilError};

/// Produces fake values by name
pub trait Generator: Send + Sync {
    /// Generates a value for the named fake kind
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Generator`] if the name is unknown.
    fn generate(&self, name: &str) -> Result<SqlValue>;

    /// Generates a value never returned before by this method for the same name
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Generator`] if the name is unknown or no fresh value
    /// could be produced.
    fn generate_unique(&self, name: &str) -> Result<SqlValue>;

    /// Locale the generator produces values for
    fn locale(&self) -> &str;
}

/// Stand-in passed to row-derived rules when no generator is configured
///
/// Derived rules that never touch the generator keep working; any call fails
/// with [`VeilError::GeneratorRequired`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl Generator for Unavailable {
    fn generate(&self, name: &str) -> Result<SqlValue> {
        Err(VeilError::GeneratorRequired(format!(
            "rule asked for '{name}' but no generator is configured"
        )))
    }

    fn generate_unique(&self, name: &str) -> Result<SqlValue> {
        self.generate(name)
    }

    fn locale(&self) -> &str {
        ""
    }
}
