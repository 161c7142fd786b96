//! CLI command implementations

pub mod ask;
pub mod rules;

use anyhow::{Context, Result};
use qms_core::AppConfig;
use std::path::Path;

/// Load configuration, letting `--rules` override the rule source.
pub fn load_config(config_path: &str, rules: Option<&Path>) -> Result<AppConfig> {
    let mut config = AppConfig::load_from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    if let Some(path) = rules {
        config.assistant.rules_path = Some(path.display().to_string());
    }
    tracing::debug!(
        config = config_path,
        rules = config.assistant.rules_path.as_deref().unwrap_or("-"),
        database = config.database.is_configured(),
        "Configuration loaded"
    );
    Ok(config)
}
