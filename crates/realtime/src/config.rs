//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `GASDESK_API_URL` - Base URL of the API server (default: http://127.0.0.1:8080)
//! - `GASDESK_RECONNECT_ATTEMPTS` - Reconnection attempts after a drop (default: 5)
//! - `GASDESK_RECONNECT_DELAY_MS` - First reconnection delay (default: 1000)
//! - `GASDESK_RECONNECT_MAX_DELAY_MS` - Cap on the doubling delay (default: 5000)

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Bounded, capped exponential backoff between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (0-based): initial * 2^attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ReconnectPolicy::default();
        let millis = |key: &str, default: Duration| -> Result<Duration, ClientConfigError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| ClientConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
                None => Ok(default),
            }
        };

        let max_attempts = match lookup("GASDESK_RECONNECT_ATTEMPTS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                ClientConfigError::InvalidEnvVar("GASDESK_RECONNECT_ATTEMPTS".to_string(), e.to_string())
            })?,
            None => defaults.max_attempts,
        };

        let api_url = lookup("GASDESK_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());

        Ok(Self {
            api_url,
            reconnect: ReconnectPolicy {
                max_attempts,
                initial_delay: millis("GASDESK_RECONNECT_DELAY_MS", defaults.initial_delay)?,
                max_delay: millis("GASDESK_RECONNECT_MAX_DELAY_MS", defaults.max_delay)?,
            },
        })
    }

    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}
