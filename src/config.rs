//! Environment configuration

use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Postgres connection string. Without one the server keeps carts in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub nats_url: Option<String>,
    pub cache: CacheConfig,
}

/// Client cart cache tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub debounce: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self { Self { debounce: Duration::from_millis(500) } }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&get, "PORT", 8083u16)?;
        let database_url = get("DATABASE_URL");
        let db_max_connections = parse_var(&get, "DB_MAX_CONNECTIONS", 10u32)?;
        let nats_url = get("NATS_URL");
        let debounce_ms = parse_var(&get, "CART_DEBOUNCE_MS", 500u64)?;

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            nats_url,
            cache: CacheConfig { debounce: Duration::from_millis(debounce_ms) },
        })
    }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid { var, reason: e.to_string() }),
        None => Ok(default),
    }
}
