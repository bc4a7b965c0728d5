//! Database connection pool management
//!
//! Builds the PostgreSQL pool for Inkwell services from settings the service
//! has already loaded, verifies it and keeps the occupancy gauges current.

mod metrics;

use metrics::update_pool_metrics;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

/// Interval between pool occupancy samples
const METRICS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum DbConfigError {
    #[error("database URL is empty")]
    MissingDatabaseUrl,
    #[error("max_connections must be at least 1")]
    NoConnections,
    #[error("min_connections ({min}) exceeds max_connections ({max})")]
    InvalidBounds { min: u32, max: u32 },
}

/// Pool settings
#[derive(Clone)]
pub struct DbConfig {
    /// Value of the `pool` label on the occupancy gauges
    pub pool_name: String,
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Wait for a free connection before failing the query
    pub acquire_timeout_secs: u64,
    /// Deadline for the `SELECT 1` run right after connecting
    pub verify_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("pool_name", &self.pool_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("verify_timeout_secs", &self.verify_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            pool_name: String::from("default"),
            database_url: String::new(),
            max_connections: 20,
            min_connections: 2,
            acquire_timeout_secs: 10,
            verify_timeout_secs: 5,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DbConfig {
    pub fn validate(&self) -> Result<(), DbConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(DbConfigError::MissingDatabaseUrl);
        }
        if self.max_connections == 0 {
            return Err(DbConfigError::NoConnections);
        }
        if self.min_connections > self.max_connections {
            return Err(DbConfigError::InvalidBounds {
                min: self.min_connections,
                max: self.max_connections,
            });
        }
        Ok(())
    }

    pub fn log_config(&self) {
        info!(
            pool = %self.pool_name,
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout_secs = self.acquire_timeout_secs,
            idle_timeout_secs = self.idle_timeout_secs,
            max_lifetime_secs = self.max_lifetime_secs,
            "Database pool configuration"
        );
    }
}

/// Connect, verify with `SELECT 1` and start sampling pool occupancy
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    match tokio::time::timeout(
        Duration::from_secs(config.verify_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(pool = %config.pool_name, "Database pool created and verified");

            update_pool_metrics(&pool, &config.pool_name);
            let sampled = pool.clone();
            let name = config.pool_name.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(METRICS_INTERVAL);
                loop {
                    interval.tick().await;
                    if sampled.is_closed() {
                        break;
                    }
                    update_pool_metrics(&sampled, &name);
                }
            });

            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(pool = %config.pool_name, error = %e, "Database connection verification failed");
            Err(e)
        }
        Err(_) => {
            error!(
                pool = %config.pool_name,
                timeout_secs = config.verify_timeout_secs,
                "Database connection verification timed out"
            );
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Database verification timeout",
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: u32, min: u32) -> DbConfig {
        DbConfig {
            database_url: "postgres://localhost/blog".to_string(),
            max_connections: max,
            min_connections: min,
            ..DbConfig::default()
        }
    }

    #[test]
    fn test_default_bounds_are_valid() {
        assert!(config(20, 2).validate().is_ok());
        assert!(config(1, 1).validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(matches!(
            config(2, 5).validate(),
            Err(DbConfigError::InvalidBounds { min: 5, max: 2 })
        ));
    }

    #[test]
    fn test_rejects_empty_pool_and_url() {
        assert!(matches!(
            config(0, 0).validate(),
            Err(DbConfigError::NoConnections)
        ));
        assert!(matches!(
            DbConfig::default().validate(),
            Err(DbConfigError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn test_debug_redacts_url() {
        let config = DbConfig {
            database_url: "postgres://user:secret@db/blog".to_string(),
            ..DbConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
