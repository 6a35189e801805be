//! MySQL implementation of [`Database`](crate::adapters::database::Database)
//! using `sqlx`.

pub mod client;
mod row;

pub use client::MySqlClient;
