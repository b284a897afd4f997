//! Configuration loading for the relsync CLI.

use anyhow::{bail, Context, Result};
use relsync_core::{AssetKey, RowFieldMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote CMDB endpoint.
    pub remote: RemoteConfig,

    /// Source database connection.
    pub database: DatabaseConfig,

    /// Creation/update query.
    pub query: String,

    /// Column mapping for the creation/update query.
    pub fields: RowFieldMap,

    /// Which asset field source identifiers match against.
    #[serde(default)]
    pub remote_key: AssetKey,

    /// Dependency label translation table.
    #[serde(default)]
    pub dependency_map: HashMap<String, String>,

    /// Impact label translation table.
    #[serde(default)]
    pub impact_map: HashMap<String, String>,

    /// Whether to run the removal pass.
    #[serde(default)]
    pub remove_links: bool,

    /// Removal query, required when `remove_links` is set.
    #[serde(default)]
    pub remove_query: Option<String>,

    /// Column mapping for the removal query.
    #[serde(default)]
    pub remove_fields: Option<RowFieldMap>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote CMDB endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

/// Source database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver: `mysql` or `postgres`.
    pub driver: String,

    pub host: String,

    #[serde(default)]
    pub port: u16,

    /// Database name.
    pub name: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Require an encrypted connection.
    #[serde(default)]
    pub encrypt: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints the schema cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.remote.base_url.is_empty() {
            bail!("remote.base_url must be set");
        }
        if self.query.trim().is_empty() {
            bail!("query must be set");
        }
        match self.database.driver.as_str() {
            "mysql" | "postgres" => {}
            other => bail!("unsupported database driver: {}", other),
        }
        if self.remove_links {
            if self.remove_query.as_deref().unwrap_or("").trim().is_empty() {
                bail!("remove_query must be set when remove_links is enabled");
            }
            if self.remove_fields.is_none() {
                bail!("remove_fields must be set when remove_links is enabled");
            }
        }
        Ok(())
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.remote.api_key.is_empty() {
            config.remote.api_key = "***REDACTED***".to_string();
        }
        if !config.database.password.is_empty() {
            config.database.password = "***REDACTED***".to_string();
        }
        config
    }
}
