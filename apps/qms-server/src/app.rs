//! Application state and initialization

use anyhow::{Context, Result};
use qms_assistant::{bootstrap, QueryAssistant};
use qms_core::AppConfig;
use qms_infra::{DatabaseHealthCheck, HealthCheck, TimeoutPolicy};
use std::sync::Arc;
use tracing::info;

use crate::cli::Args;
use crate::server::Server;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<QueryAssistant>,
    pub database: Arc<dyn HealthCheck>,
    /// Whether a database URL was configured; readiness only fails on an
    /// unreachable database that was asked for.
    pub database_configured: bool,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        info!("Initializing application components");

        let boot = bootstrap(config).await;
        let database = DatabaseHealthCheck::new(boot.pool)
            .with_timeouts(TimeoutPolicy::from_config(&config.database));

        Ok(Self {
            assistant: Arc::new(boot.assistant),
            database: Arc::new(database),
            database_configured: config.database.is_configured(),
        })
    }
}

/// Main application
pub struct App {
    config: AppConfig,
    state: AppState,
}

impl App {
    /// Build the application with all dependencies
    pub async fn build(args: Args) -> Result<Self> {
        let mut config = AppConfig::load_from_file(args.config_path()?)
            .context("Failed to load configuration")?;
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if let Some(rules) = &args.rules {
            config.assistant.rules_path = Some(rules.display().to_string());
        }

        let state = AppState::new(&config).await?;
        Ok(Self { config, state })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        info!("Starting server");
        info!("HTTP address: {}", self.config.server.address());

        let server = Server::new(self.config.server, self.state);
        server.run().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_state_creation() {
        let state = AppState::new(&AppConfig::default()).await.unwrap();
        assert!(!state.database_configured);
        assert!(!state.assistant.rules().is_empty());
    }
}
