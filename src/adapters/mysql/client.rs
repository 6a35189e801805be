//! MySQL client implementation

use super::row::{bind_params, decode_row};
use crate::adapters::database::Database;
use crate::config::DatabaseConfig;
use crate::core::planner::Statement;
use crate::domain::{DatabaseError, Result, Row, VeilError};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::Executor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DISABLE_FOREIGN_KEY_CHECKS: &str = "SET FOREIGN_KEY_CHECKS=0";

/// MySQL client backed by a `sqlx` connection pool
///
/// `FOREIGN_KEY_CHECKS` is a session variable, so once disabled it is
/// re-applied to every pooled connection when it is opened or handed out.
pub struct MySqlClient {
    pool: MySqlPool,
    database: String,
    host: String,
    foreign_key_checks_disabled: Arc<AtomicBool>,
}

impl MySqlClient {
    /// Create a new MySQL client
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConnectionFailed`] if the pool cannot open its
    /// first connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.password.expose_secret().as_ref())
            .database(&config.database);

        let disabled = Arc::new(AtomicBool::new(false));
        let on_connect = Arc::clone(&disabled);
        let on_acquire = Arc::clone(&disabled);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .after_connect(move |conn, _meta| {
                let disabled = Arc::clone(&on_connect);
                Box::pin(async move {
                    if disabled.load(Ordering::Acquire) {
                        conn.execute(sqlx::raw_sql(DISABLE_FOREIGN_KEY_CHECKS))
                            .await?;
                    }
                    Ok(())
                })
            })
            .before_acquire(move |conn, _meta| {
                let disabled = Arc::clone(&on_acquire);
                Box::pin(async move {
                    if disabled.load(Ordering::Acquire) {
                        conn.execute(sqlx::raw_sql(DISABLE_FOREIGN_KEY_CHECKS))
                            .await?;
                    }
                    Ok(true)
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                host: format!("{}:{}", config.host, config.port),
                message: e.to_string(),
            })?;

        tracing::info!(
            host = %config.host,
            database = %config.database,
            max_connections = config.max_connections,
            "Connected to MySQL"
        );

        Ok(Self {
            pool,
            database: config.database.clone(),
            host: config.host.clone(),
            foreign_key_checks_disabled: disabled,
        })
    }

    /// Closes every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Database for MySqlClient {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                host: self.host.clone(),
                message: e.to_string(),
            })?;
        tracing::info!(database = %self.database, "MySQL connection test successful");
        Ok(())
    }

    fn stream<'a>(&'a self, statement: &'a Statement) -> BoxStream<'a, Result<Row>> {
        tracing::trace!(statement = %statement.text(), "Streaming query");
        bind_params(sqlx::query(statement.sql()), statement.params())
            .fetch(&self.pool)
            .map(move |row| match row {
                Ok(row) => decode_row(&row).map_err(VeilError::from),
                Err(e) => Err(DatabaseError::query_failed(statement.text(), e).into()),
            })
            .boxed()
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>> {
        tracing::trace!(statement = %statement.text(), "Fetching rows");
        let rows = bind_params(sqlx::query(statement.sql()), statement.params())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::query_failed(statement.text(), e))?;
        rows.iter()
            .map(|row| decode_row(row).map_err(VeilError::from))
            .collect()
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        tracing::trace!(statement = %statement.text(), "Executing statement");
        let result = bind_params(sqlx::query(statement.sql()), statement.params())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::query_failed(statement.text(), e))?;
        Ok(result.rows_affected())
    }

    async fn execute_raw(&self, sql: &str) -> Result<()> {
        tracing::trace!(statement = %sql, "Executing raw SQL");
        self.pool
            .execute(sqlx::raw_sql(sql))
            .await
            .map_err(|e| DatabaseError::query_failed(sql, e))?;
        Ok(())
    }

    async fn disable_foreign_key_checks(&self) -> Result<()> {
        self.foreign_key_checks_disabled
            .store(true, Ordering::Release);
        // Idle connections pick the setting up in before_acquire; this
        // round-trip surfaces permission errors before any DDL runs.
        self.execute_raw(DISABLE_FOREIGN_KEY_CHECKS).await?;
        tracing::info!(database = %self.database, "Foreign key checks disabled");
        Ok(())
    }
}
