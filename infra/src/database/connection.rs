//! MySQL connection pool management

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::{error, info};

use kg_shared::config::DatabaseConfig;

use crate::InfrastructureError;

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatistics {
    /// Open connections, idle or in use
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
}

/// Wrapper around the SQLx MySQL pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: MySqlPool,
    max_connections: u32,
}

impl DatabasePool {
    /// Open a pool with the given configuration
    ///
    /// # Errors
    /// * `InfrastructureError::Config` - Empty URL
    /// * `InfrastructureError::Database` - The first connection could not be established
    pub async fn new(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        if config.url.trim().is_empty() {
            return Err(InfrastructureError::Config("DATABASE_URL is empty".to_string()));
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(&config.url)
            .await
            .map_err(|e| {
                error!(
                    url = %config.redacted_url(),
                    error = %e,
                    event = "database_connect_failed",
                    "Failed to connect to MySQL"
                );
                InfrastructureError::Database(e)
            })?;

        info!(
            url = %config.redacted_url(),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            event = "database_connected",
            "MySQL connection pool ready"
        );

        Ok(Self {
            pool,
            max_connections: config.max_connections,
        })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool, max_connections: u32) -> Self {
        Self { pool, max_connections }
    }

    pub fn get_pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> Result<(), InfrastructureError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max_connections: self.max_connections,
        }
    }

    /// Close every connection; further acquires fail
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
