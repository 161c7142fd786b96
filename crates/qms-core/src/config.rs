use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_env("QMS")
    }

    /// Load configuration from environment with custom prefix
    pub fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let builder = Self::builder_with_defaults()?.add_source(
            Environment::with_prefix(prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load configuration from file with environment overrides.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Self::builder_with_defaults()?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("QMS")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    fn builder_with_defaults(
    ) -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.query_timeout_ms", 3000)?
            .set_default("database.connect_timeout_ms", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("assistant.min_match_score", 2.0)?
            .set_default("assistant.preview_rows", 5)?
            .set_default("assistant.suggestion_count", 5)?
            .set_default("assistant.rules_from_database", false)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

/// Database configuration.
///
/// `url` is optional: without it the database tier is skipped and queries are
/// answered from the synced snapshot or mock data.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn new(url: String) -> Self {
        Self {
            url: Some(url),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.url.as_deref().map(|u| !u.trim().is_empty()).unwrap_or(false)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            query_timeout_ms: default_query_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_query_timeout_ms() -> u64 {
    3000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }

    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Query assistant tuning
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Minimum weighted score a rule needs to be selected
    #[serde(default = "default_min_match_score")]
    pub min_match_score: f64,
    /// Rows included in the response preview table
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Example queries offered when nothing matched
    #[serde(default = "default_suggestion_count")]
    pub suggestion_count: usize,
    /// JSON or YAML file holding rule records
    #[serde(default)]
    pub rules_path: Option<String>,
    /// Load rules from the `nlp_intent_rules` table
    #[serde(default)]
    pub rules_from_database: bool,
}

impl AssistantConfig {
    pub fn with_min_match_score(mut self, score: f64) -> Self {
        self.min_match_score = score;
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    pub fn with_rules_path(mut self, path: impl Into<String>) -> Self {
        self.rules_path = Some(path.into());
        self
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            min_match_score: default_min_match_score(),
            preview_rows: default_preview_rows(),
            suggestion_count: default_suggestion_count(),
            rules_path: None,
            rules_from_database: false,
        }
    }
}

fn default_min_match_score() -> f64 {
    2.0
}

fn default_preview_rows() -> usize {
    5
}

fn default_suggestion_count() -> usize {
    5
}
