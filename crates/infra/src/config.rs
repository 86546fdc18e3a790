//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `GASDESK_HOST` - Bind address (default: 0.0.0.0)
//! - `GASDESK_PORT` - Listen port (default: 8080)
//! - `JWT_SECRET` - HS256 secret for bearer tokens (required unless `GASDESK_DEV` is set)
//! - `GASDESK_DEV` - `1`/`true` allows a missing `JWT_SECRET` (development secret, logs a warning)
//! - `LOW_STOCK_THRESHOLD` - Stock at or below which `inventory:low-stock` fires (default: 10)
//! - `REALTIME_BUFFER` - Capacity of the realtime broadcast channel (default: 256)
//! - `DATABASE_URL` - Postgres connection string; in-memory stores when unset

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

const DEV_JWT_SECRET: &str = "gasdesk-dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),

    #[error("Missing environment variable {0}")]
    MissingEnvVar(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: String,
    pub low_stock_threshold: u32,
    pub realtime_buffer: usize,
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = parse(&get("GASDESK_HOST", "0.0.0.0"), "GASDESK_HOST")?;
        let port = parse(&get("GASDESK_PORT", "8080"), "GASDESK_PORT")?;
        let low_stock_threshold = parse(&get("LOW_STOCK_THRESHOLD", "10"), "LOW_STOCK_THRESHOLD")?;
        let realtime_buffer: usize = parse(&get("REALTIME_BUFFER", "256"), "REALTIME_BUFFER")?;
        if realtime_buffer == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REALTIME_BUFFER".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let dev_mode = lookup("GASDESK_DEV")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"));
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            // A database means a real deployment, dev mode or not.
            None if dev_mode && database_url.is_none() => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string())),
        };

        Ok(Self {
            host,
            port,
            jwt_secret,
            low_stock_threshold,
            realtime_buffer,
            database_url,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Loopback on an ephemeral port with no JWT secret; the app refuses to
/// start until one is set.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            jwt_secret: String::new(),
            low_stock_threshold: 10,
            realtime_buffer: 256,
            database_url: None,
        }
    }
}

fn parse<T>(raw: &str, key: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[("GASDESK_DEV", "1")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.low_stock_threshold, 10);
        assert_eq!(config.realtime_buffer, 256);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn jwt_secret_is_required_outside_dev_mode() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "JWT_SECRET"));

        let with_database = AppConfig::from_lookup(lookup(&[
            ("GASDESK_DEV", "true"),
            ("DATABASE_URL", "postgres://localhost/gasdesk"),
        ]));
        assert!(with_database.is_err());

        assert!(AppConfig::default().jwt_secret.is_empty());
    }

    #[test]
    fn values_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GASDESK_HOST", "127.0.0.1"),
            ("GASDESK_PORT", "9000"),
            ("JWT_SECRET", "s3cr3t"),
            ("LOW_STOCK_THRESHOLD", "3"),
        ]))
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.jwt_secret, "s3cr3t");
        assert_eq!(config.low_stock_threshold, 3);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[("GASDESK_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("GASDESK_PORT"));

        assert!(AppConfig::from_lookup(lookup(&[("GASDESK_DEV", "1"), ("REALTIME_BUFFER", "0")])).is_err());
    }
}
