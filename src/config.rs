//! Configuration management for Shelfmark server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{env, time::Duration};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite://path/to/file.db`, `sqlite::memory:` or `memory` for the
    /// non-durable in-process store
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LendingConfig {
    /// Longest time a borrow/return waits for another operation on the same
    /// book. 0 waits forever.
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub lending: LendingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SHELFMARK_SERVER__PORT=9000, SHELFMARK_LENDING__LOCK_TIMEOUT_MS=100, ...
            .add_source(
                Environment::with_prefix("SHELFMARK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// True when the catalog should live in process memory only
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case("memory")
    }
}

impl LendingConfig {
    pub fn lock_timeout(&self) -> Option<Duration> {
        (self.lock_timeout_ms > 0).then(|| Duration::from_millis(self.lock_timeout_ms))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://shelfmark.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self { lock_timeout_ms: 5000 }
    }
}
