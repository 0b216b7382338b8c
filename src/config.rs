//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in seconds applied to every cache entry
    pub cache_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds, 0 = lazy expiry only
    pub sweep_interval: u64,
    /// Requests per second allowed for each client
    pub rate_limit_per_second: u32,
    /// Burst size allowed for each client
    pub rate_limit_burst: u32,
    /// Seconds without traffic after which a client's limiter is dropped
    pub limiter_idle_ttl: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL` - Cache entry TTL in seconds, 0 is ignored (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds, 0 disables (default: 60)
    /// - `RATE_LIMIT_PER_SECOND` - Per-client request rate (default: 50)
    /// - `RATE_LIMIT_BURST` - Per-client burst (default: 100)
    /// - `LIMITER_IDLE_TTL` - Idle limiter eviction in seconds, 0 is ignored (default: 180)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl: env_ttl_or("CACHE_TTL", defaults.cache_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            rate_limit_per_second: env_or("RATE_LIMIT_PER_SECOND", defaults.rate_limit_per_second),
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            limiter_idle_ttl: env_ttl_or("LIMITER_IDLE_TTL", defaults.limiter_idle_ttl),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// The sweep period, or `None` when entries expire lazily only.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    pub fn limiter_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.limiter_idle_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: 300,
            server_port: 3000,
            sweep_interval: 60,
            rate_limit_per_second: 50,
            rate_limit_burst: 100,
            limiter_idle_ttl: 180,
        }
    }
}

/// Reads and parses `name`, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`env_or`] for TTLs in seconds, where 0 is invalid.
fn env_ttl_or(name: &str, default: u64) -> u64 {
    match env_or(name, default) {
        0 => default,
        secs => secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval, 60);
        assert_eq!(config.rate_limit_per_second, 50);
        assert_eq!(config.rate_limit_burst, 100);
        assert_eq!(config.limiter_idle_ttl, 180);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_TTL");
        env::remove_var("SERVER_PORT");
        env::remove_var("SWEEP_INTERVAL");
        env::remove_var("RATE_LIMIT_PER_SECOND");
        env::remove_var("RATE_LIMIT_BURST");
        env::remove_var("LIMITER_IDLE_TTL");

        let config = Config::from_env();
        assert_eq!(config.cache_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval, 60);
        assert_eq!(config.limiter_idle_ttl, 180);
    }

    #[test]
    fn test_env_or_invalid_falls_back() {
        env::set_var("TTLMAP_TEST_INVALID_PORT", "not-a-port");
        assert_eq!(env_or("TTLMAP_TEST_INVALID_PORT", 8080u16), 8080);

        env::set_var("TTLMAP_TEST_VALID_PORT", "9090");
        assert_eq!(env_or("TTLMAP_TEST_VALID_PORT", 8080u16), 9090);
    }

    #[test]
    fn test_zero_ttl_falls_back() {
        env::set_var("TTLMAP_TEST_ZERO_TTL", "0");
        assert_eq!(env_ttl_or("TTLMAP_TEST_ZERO_TTL", 300), 300);

        env::set_var("TTLMAP_TEST_SET_TTL", "30");
        assert_eq!(env_ttl_or("TTLMAP_TEST_SET_TTL", 300), 30);
    }

    #[test]
    fn test_durations() {
        let mut config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(60)));

        config.sweep_interval = 0;
        assert_eq!(config.sweep_interval(), None);
    }
}
