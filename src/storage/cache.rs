//! Document cache.
//!
//! An [`EntityCache`] is the cache tier consulted by cache-aware lookups
//! ([`Index::fetch`](crate::index::Index::fetch)). Callers either pass a cache
//! scoped to their unit of work or use the default cache owned by the index.
//! Entries expire after the configured TTL; nothing else invalidates them
//! implicitly.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::config::CacheConfig;
use crate::entity::EntityId;
use crate::storage::{Document, StorageError};

const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn cache_key(doc_type: &str, id: &EntityId) -> String {
    format!("{doc_type}-{id}")
}

#[derive(Debug, Clone)]
struct CacheEntry {
    document: Document,
    cached_at: DateTime<Utc>,
}

/// Thread-safe cache of documents keyed by `<type>-<id>`.
#[derive(Debug)]
pub struct EntityCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl EntityCache {
    /// Creates an empty cache. Out-of-range settings are clamped.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        #[allow(clippy::cast_possible_wrap)]
        let ttl_secs = config.ttl_secs.min(MAX_TTL_SECS) as i64;
        Self {
            ttl: Duration::seconds(ttl_secs),
            max_entries: config.max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached document if present and not expired.
    pub fn get(&self, doc_type: &str, id: &EntityId) -> Result<Option<Document>, StorageError> {
        let entries = self.entries.read().map_err(|_| lock_err("cache.get"))?;
        let Some(entry) = entries.get(&cache_key(doc_type, id)) else {
            return Ok(None);
        };
        if Utc::now() - entry.cached_at >= self.ttl {
            return Ok(None);
        }
        Ok(Some(entry.document.clone()))
    }

    /// Stores a document, clearing the cache first if it is full.
    pub fn put(&self, doc_type: &str, document: Document) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| lock_err("cache.put"))?;
        let key = cache_key(doc_type, &document.id);
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            // Keep the cache bounded to avoid unbounded memory usage.
            tracing::debug!(target: "docmap::cache", entries = entries.len(), "cache full, clearing");
            entries.clear();
        }
        entries.insert(
            key,
            CacheEntry {
                document,
                cached_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Drops a single document.
    pub fn invalidate(&self, doc_type: &str, id: &EntityId) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| lock_err("cache.invalidate"))?;
        entries.remove(&cache_key(doc_type, id));
        Ok(())
    }

    /// Drops every document.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| lock_err("cache.clear"))?;
        entries.clear();
        Ok(())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> Result<usize, StorageError> {
        let entries = self.entries.read().map_err(|_| lock_err("cache.len"))?;
        Ok(entries.len())
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
