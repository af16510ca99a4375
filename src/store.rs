//! In-memory TTL cache for datasets and summaries
//!
//! Values are stored behind `Arc`, so a write swaps the whole value for a key
//! and concurrent readers see either the old or the new value, never a mix.

use crate::{
    clock::Clock,
    constants::CACHE_TTL_SECS,
    types::{Dataset, Summary},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Value held by a cache entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CacheValue {
    Dataset(Dataset),
    Summary(Summary),
}

impl CacheValue {
    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            CacheValue::Dataset(dataset) => Some(dataset),
            CacheValue::Summary(_) => None,
        }
    }

    pub fn as_summary(&self) -> Option<&Summary> {
        match self {
            CacheValue::Summary(summary) => Some(summary),
            CacheValue::Dataset(_) => None,
        }
    }
}

impl From<Dataset> for CacheValue {
    fn from(dataset: Dataset) -> Self {
        CacheValue::Dataset(dataset)
    }
}

impl From<Summary> for CacheValue {
    fn from(summary: Summary) -> Self {
        CacheValue::Summary(summary)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<CacheValue>,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    /// Age of the entry, zero if the clock moved backwards
    fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) >= self.ttl
    }
}

/// Key-addressed store with per-entry time-to-live
///
/// Expired entries read as absent. They are dropped lazily by `get` and
/// eagerly by [`DataCache::purge_expired`].
pub struct DataCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DataCache {
    /// Creates a cache with the default 5 minute TTL
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_default_ttl(Duration::from_secs(CACHE_TTL_SECS), clock)
    }

    pub fn with_default_ttl(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous value
    pub async fn set(&self, key: &str, value: impl Into<CacheValue>, ttl: Duration) {
        let entry = CacheEntry {
            value: Arc::new(value.into()),
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        tracing::debug!(key = key, ttl_secs = ttl.as_secs(), "Cache entry stored");
    }

    /// Stores `value` under `key` with the default TTL
    pub async fn set_default(&self, key: &str, value: impl Into<CacheValue>) {
        self.set(key, value, self.default_ttl).await;
    }

    /// Gets the live value for `key`
    ///
    /// # Returns
    /// None if the key was never set, was deleted, or has expired
    pub async fn get(&self, key: &str) -> Option<Arc<CacheValue>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless a writer replaced it in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
            tracing::debug!(key = key, "Cache entry expired");
        }
        None
    }

    /// Gets the dataset stored under `key`, if any
    pub async fn get_dataset(&self, key: &str) -> Option<Dataset> {
        self.get(key)
            .await
            .and_then(|value| value.as_dataset().cloned())
    }

    /// Gets the summary stored under `key`, if any
    pub async fn get_summary(&self, key: &str) -> Option<Summary> {
        self.get(key)
            .await
            .and_then(|value| value.as_summary().cloned())
    }

    /// Removes `key`; returns true if a live entry was removed
    pub async fn delete(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .write()
            .await
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// True if `key` holds a live entry
    pub async fn exists(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Time left before `key` expires, None if absent or expired
    pub async fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        entry.ttl.checked_sub(entry.age(now)).filter(|d| !d.is_zero())
    }

    /// Live keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Removes every expired entry; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}
