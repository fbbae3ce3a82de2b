//! Cache configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Runtime configuration for the content cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the content cache. When disabled, every read loads from the
    /// store (stale entries are still retained for the fallback chain).
    pub enabled: bool,
    /// Seconds a cached entry is served without touching the store.
    pub ttl_seconds: u64,
    /// Cadence of the background sweep that evicts expired entries.
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl_seconds,
            sweep_interval_seconds: settings.sweep_interval_seconds,
        }
    }
}

impl CacheConfig {
    /// Effective entry time-to-live; zero when the cache is disabled.
    pub fn ttl(&self) -> Duration {
        if self.enabled {
            Duration::from_secs(self.ttl_seconds)
        } else {
            Duration::ZERO
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl_seconds, 300);
        assert_eq!(config.sweep_interval_seconds, 60);
    }

    #[test]
    fn disabled_cache_has_zero_ttl() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(config.ttl(), Duration::ZERO);
    }

    #[test]
    fn sweep_interval_never_zero() {
        let config = CacheConfig {
            sweep_interval_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }
}
