use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

/// Where analyses are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-lifetime only.
    Memory,
    /// sled database under `db_path`.
    Sled,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "sled" | "disk" => Ok(StoreBackend::Sled),
            other => bail!("unknown store backend {other:?} (expected \"memory\" or \"sled\")"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub db_path: String,
    /// Trained-model service tried before the heuristic. `None` skips it.
    pub ml_service_url: Option<String>,
    pub ml_timeout: Duration,
    /// Page size of `/api/analyses` when no `limit` is given.
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            store_backend: StoreBackend::Memory,
            db_path: "data/db/analyses".to_string(),
            ml_service_url: None,
            ml_timeout: Duration::from_millis(2000),
            recent_limit: 10,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let ml_service_url = lookup("ML_SERVICE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let ml_timeout = match lookup("ML_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse().with_context(|| format!("ML_TIMEOUT_MS must be a number, got {ms:?}"))?,
            ),
            None => defaults.ml_timeout,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            store_backend: parse_or(&lookup, "STORE_BACKEND", defaults.store_backend)?,
            db_path: lookup("DB_PATH").unwrap_or(defaults.db_path),
            ml_service_url,
            ml_timeout,
            recent_limit: parse_or(&lookup, "RECENT_LIMIT", defaults.recent_limit)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key} value {raw:?}: {e}")),
        None => Ok(default),
    }
}
