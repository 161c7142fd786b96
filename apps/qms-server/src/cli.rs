//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "qms-server",
    about = "QMS query assistant server",
    version,
    long_about = "HTTP service answering quality-management questions about inventory, \
                  lab tests and production-line tracking."
)]
pub struct Args {
    /// Path to configuration file (extension optional)
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/qms")]
    pub config: PathBuf,

    /// HTTP server port, overrides the configuration
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Rule file (JSON or YAML), overrides the configuration
    #[arg(short, long, env = "QMS_RULES")]
    pub rules: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// Environment (dev, staging, prod)
    #[arg(
        short,
        long,
        env = "ENVIRONMENT",
        default_value = "dev",
        value_parser = ["dev", "staging", "prod"]
    )]
    pub env: String,

    /// Enable JSON log format (useful for production)
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Args {
    pub fn config_path(&self) -> anyhow::Result<&str> {
        self.config
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("configuration path is not valid UTF-8"))
    }
}
