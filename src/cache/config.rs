//! Cache configuration.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_DISCOUNT_TTL_SECS: u64 = 3600;

/// Expiry policy applied by the cache service.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expiry for read-through entries.
    pub default_ttl: Duration,
    /// Expiry for discount overlay entries written by the reconciler.
    pub discount_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            discount_ttl: Duration::from_secs(DEFAULT_DISCOUNT_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            default_ttl: Duration::from_secs(settings.default_ttl_seconds.get().into()),
            discount_ttl: Duration::from_secs(settings.discount_ttl_seconds.get().into()),
        }
    }
}
