//! Time-bounded fetch cache
//!
//! Memoizes expensive upstream collections for a freshness window. Values are
//! shared as `Arc<V>` and replaced wholesale on refresh. A failed refresh
//! leaves the previous entry untouched but does not serve it: the caller gets
//! the error.
//!
//! At most one fetch per key is in flight. Each key has its own lock;
//! readers share it, a refresh holds it exclusively, and concurrent misses
//! re-check freshness after the refresh completes.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// A cached value and when it was fetched
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: Arc<V>,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched_at.elapsed() < max_age
    }
}

type Slot<V> = Arc<RwLock<Option<CacheEntry<V>>>>;

/// Keyed cache with single-flight refresh
pub struct FetchCache<K, V> {
    name: &'static str,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> FetchCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    /// Create an empty cache. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.clone()).or_default().clone()
    }

    /// Return the cached value for `key` if younger than `max_age`, otherwise
    /// run `fetcher`, store its value and return it.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &K,
        max_age: Duration,
        fetcher: F,
    ) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);

        {
            let entry = slot.read().await;
            if let Some(entry) = entry.as_ref().filter(|e| e.is_fresh(max_age)) {
                debug!(cache = self.name, ?key, "cache hit");
                return Ok(entry.value.clone());
            }
        }

        let mut entry = slot.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(fresh) = entry.as_ref().filter(|e| e.is_fresh(max_age)) {
            debug!(cache = self.name, ?key, "cache filled by concurrent fetch");
            return Ok(fresh.value.clone());
        }

        debug!(cache = self.name, ?key, "cache miss, fetching");
        let value = Arc::new(fetcher().await?);
        *entry = Some(CacheEntry {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop the entry for `key` so the next read refetches
    pub async fn invalidate(&self, key: &K) {
        let slot = self.slot(key);
        *slot.write().await = None;
    }
}
