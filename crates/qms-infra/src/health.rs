//! Readiness checks.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::mysql::MySqlPool;
use std::time::{Duration, Instant};

use crate::timeout::{TimeoutOrError, TimeoutPolicy};

/// Result of one health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub component: String,
    pub healthy: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthStatus {
    pub fn healthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            healthy: true,
            message: message.into(),
            latency_ms: None,
        }
    }

    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            healthy: false,
            message: message.into(),
            latency_ms: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = Some(latency.as_millis() as u64);
        self
    }
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> HealthStatus;
}

/// Pings the database, if one is configured.
#[derive(Debug, Clone)]
pub struct DatabaseHealthCheck {
    pool: Option<MySqlPool>,
    timeouts: TimeoutPolicy,
}

impl DatabaseHealthCheck {
    pub fn new(pool: Option<MySqlPool>) -> Self {
        Self {
            pool,
            timeouts: TimeoutPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[async_trait]
impl HealthCheck for DatabaseHealthCheck {
    async fn check(&self) -> HealthStatus {
        let Some(pool) = &self.pool else {
            return HealthStatus::unhealthy("database", "not configured");
        };

        let started = Instant::now();
        let ping = sqlx::query("SELECT 1").execute(pool);
        match self.timeouts.run_query("health_ping", ping).await {
            Ok(_) => HealthStatus::healthy("database", "reachable").with_latency(started.elapsed()),
            Err(TimeoutOrError::Timeout(e)) => HealthStatus::unhealthy("database", e.to_string()),
            Err(TimeoutOrError::Error(e)) => {
                HealthStatus::unhealthy("database", format!("unreachable: {}", e))
            }
        }
    }
}
