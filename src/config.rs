//! Configuration of an [`Index`](crate::index::Index).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration of the entity caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached documents before the cache is cleared.
    pub max_entries: usize,
    /// Seconds a cached document stays valid.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            ttl_secs: 60,
        }
    }
}

/// Index configuration.
///
/// # Examples
///
/// ```
/// use docmap::IndexConfig;
///
/// let config = IndexConfig::from_json_str(r#"{"cache": {"ttl_secs": 5}}"#).unwrap();
/// assert_eq!(config.cache.ttl_secs, 5);
/// assert_eq!(config.cache.max_entries, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Settings of the default cache and of caches created via
    /// [`Index::new_cache`](crate::index::Index::new_cache).
    pub cache: CacheConfig,
    /// Limit applied to selections which don't specify one. `None` is unbounded.
    pub default_limit: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            default_limit: None,
        }
    }
}

impl IndexConfig {
    const MAX_TTL_SECS: u64 = 24 * 60 * 60;

    /// Parses and validates a JSON configuration. Missing keys use defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()
    }

    /// Checks ranges and returns the configuration unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first out-of-range setting.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.max_entries".to_string(),
                reason: "must be > 0".to_string(),
            });
        }

        if self.cache.ttl_secs > Self::MAX_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "cache.ttl_secs".to_string(),
                reason: format!("must be at most {} (got {})", Self::MAX_TTL_SECS, self.cache.ttl_secs),
            });
        }

        if self.default_limit == Some(0) {
            return Err(ConfigError::Invalid {
                field: "default_limit".to_string(),
                reason: "must be > 0 when set".to_string(),
            });
        }

        Ok(self)
    }
}
