//! MySQL connection pool.

use qms_core::DatabaseConfig;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::{info, warn};

use crate::{InfraError, Result};

/// Connect a pool and verify it with a round trip.
pub async fn create_pool(config: &DatabaseConfig) -> Result<MySqlPool> {
    let url = config
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| InfraError::configuration("database.url is not set"))?;

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(config.connect_timeout())
        .connect(url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    info!(
        max_connections = config.max_connections,
        "Database pool connected"
    );
    Ok(pool)
}

/// Connect when a URL is configured; a failure is logged and yields `None`
/// so the service can run from snapshot and mock data.
pub async fn connect_optional(config: &DatabaseConfig) -> Option<MySqlPool> {
    if !config.is_configured() {
        info!("No database configured, database tier disabled");
        return None;
    }
    match create_pool(config).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %e, "Database unavailable, continuing without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_requires_url() {
        let result = create_pool(&DatabaseConfig::default()).await;
        assert!(matches!(result, Err(InfraError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_optional_without_url() {
        assert!(connect_optional(&DatabaseConfig::default()).await.is_none());
    }
}
