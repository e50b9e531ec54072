//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries a cache can hold
    pub capacity: usize,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Bypass the cache instead of failing on arguments that cannot form a key
    pub tolerate_unhashable_args: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RANDCACHE_CAPACITY` - Maximum cache entries (default: 128)
    /// - `RANDCACHE_TTL` - Entry lifetime in seconds (default: 300)
    /// - `RANDCACHE_TOLERATE_UNHASHABLE` - Bypass on unhashable arguments (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            capacity: lookup("RANDCACHE_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            ttl_secs: lookup("RANDCACHE_TTL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl_secs),
            tolerate_unhashable_args: lookup("RANDCACHE_TOLERATE_UNHASHABLE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.tolerate_unhashable_args),
        }
    }

    /// Entry lifetime as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Rejects a zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 128,
            ttl_secs: 300,
            tolerate_unhashable_args: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.capacity, 128);
        assert_eq!(config.ttl_secs, 300);
        assert!(!config.tolerate_unhashable_args);
        assert_eq!(config.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_lookup_defaults() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("RANDCACHE_CAPACITY", "16"),
            ("RANDCACHE_TTL", "10"),
            ("RANDCACHE_TOLERATE_UNHASHABLE", "true"),
        ]));
        assert_eq!(config.capacity, 16);
        assert_eq!(config.ttl_secs, 10);
        assert!(config.tolerate_unhashable_args);
    }

    #[test]
    fn test_config_lookup_unparsable_falls_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("RANDCACHE_CAPACITY", "lots"),
            ("RANDCACHE_TTL", "-5"),
            ("RANDCACHE_TOLERATE_UNHASHABLE", "yes"),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            capacity: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }
}
