//! Database client factory

use crate::adapters::database::{Database, DryRunDatabase};
use crate::adapters::mysql::MySqlClient;
use crate::config::DatabaseConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Connects to a database described by configuration
///
/// With `dry_run` the client is wrapped in a [`DryRunDatabase`] so reads hit
/// the server and writes are only logged.
///
/// # Errors
///
/// Returns an error if the connection cannot be established
pub async fn create_database(config: &DatabaseConfig, dry_run: bool) -> Result<Arc<dyn Database>> {
    tracing::info!(host = %config.host, database = %config.database, dry_run, "Creating MySQL client");
    let client = MySqlClient::connect(config).await?;
    client.test_connection().await?;

    if dry_run {
        Ok(Arc::new(DryRunDatabase::new(Arc::new(client))) as Arc<dyn Database>)
    } else {
        Ok(Arc::new(client) as Arc<dyn Database>)
    }
}
