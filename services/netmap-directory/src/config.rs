//! Directory service configuration.

use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 80;
const DEFAULT_REDIS_URL: &str = "redis://redis:6379";
const DEFAULT_KEY_PREFIX: &str = "netmap";
const DEFAULT_CACHE_TIMEOUT_MS: u64 = 30_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid number: {reason}")]
    InvalidNumber { name: &'static str, reason: String },
    #[error("CACHE_TIMEOUT_MS must be greater than zero")]
    ZeroCacheTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub port: u16,
    pub redis_url: String,
    pub redis_key_prefix: String,
    /// Lifetime of a cached network map before the next request refreshes it.
    pub cache_timeout: Duration,
}

impl DirectoryConfig {
    /// Load configuration from the process environment.
    ///
    /// - `PORT` (default 80)
    /// - `REDIS_URL` (default `redis://redis:6379`)
    /// - `REDIS_KEY_PREFIX` (default `netmap`)
    /// - `CACHE_TIMEOUT_MS` (default 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_number(&lookup, "PORT", DEFAULT_PORT)?;
        let cache_timeout_ms = parse_number(&lookup, "CACHE_TIMEOUT_MS", DEFAULT_CACHE_TIMEOUT_MS)?;
        if cache_timeout_ms == 0 {
            return Err(ConfigError::ZeroCacheTimeout);
        }

        Ok(Self {
            port,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            redis_key_prefix: lookup("REDIS_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            cache_timeout: Duration::from_millis(cache_timeout_ms),
        })
    }
}

fn parse_number<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidNumber {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<DirectoryConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DirectoryConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 80);
        assert_eq!(config.redis_url, "redis://redis:6379");
        assert_eq!(config.redis_key_prefix, "netmap");
        assert_eq!(config.cache_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("REDIS_KEY_PREFIX", "doorman"),
            ("CACHE_TIMEOUT_MS", "1500"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.redis_key_prefix, "doorman");
        assert_eq!(config.cache_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "PORT", .. }));
        assert!(err.to_string().starts_with("PORT must be a valid number"));
    }

    #[test]
    fn test_zero_cache_timeout_is_rejected() {
        let err = config_from(&[("CACHE_TIMEOUT_MS", "0")]).unwrap_err();
        assert_eq!(err, ConfigError::ZeroCacheTimeout);
    }
}
