use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_DB_URL: &str = "FILLS_DATABASE_URL";
pub const ENV_DAEMON_ADDR: &str = "FILLS_DAEMON_ADDR";
pub const ENV_QUERY_TIMEOUT_MS: &str = "FILLS_QUERY_TIMEOUT_MS";

/// Typed view of the merged config document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://trades.sqlite` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
    /// Upper bound on one store round trip (acquire + prepare + fetch).
    pub query_timeout_ms: u64,
    /// Attempts for the initial connect; queries are never retried.
    pub connect_attempts: u32,
    /// Base backoff between connect attempts, doubled each retry.
    pub connect_backoff_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://trades.sqlite".to_string(),
            max_connections: 4,
            query_timeout_ms: 5_000,
            connect_attempts: 3,
            connect_backoff_ms: 200,
        }
    }
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Allowed CORS origins. Empty means localhost-only defaults.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Apply `FILLS_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|k| std::env::var(k).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with an
    /// injectable lookup. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_DB_URL) {
            self.database.url = url;
        }
        if let Some(addr) = get(ENV_DAEMON_ADDR) {
            self.server.addr = addr;
        }
        if let Some(ms) = get(ENV_QUERY_TIMEOUT_MS) {
            self.database.query_timeout_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("{ENV_QUERY_TIMEOUT_MS} must be an integer, got {ms:?}"))?;
        }
        Ok(self)
    }
}
