//! Bounded stale-while-revalidate cache
//!
//! Entries move through three zones: fresh values are served as is, stale
//! values are served while one background task reloads them, and expired
//! values (or missing keys) are loaded on the caller's path. Capacity is
//! bounded by an LRU; eviction ignores freshness.
//!
//! Concurrent misses for the same key are not coalesced: each caller runs
//! its own loader and the last one to finish wins.
//!
//! Background refreshes run on the ambient tokio runtime. Outside one, stale
//! values are still served but nothing refreshes them before they expire.

use crate::entry::{CacheEntry, Freshness};
use crate::errors::{CacheError, Result};
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use shuto_core::{system_clock, SharedClock};
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Stale-while-revalidate cache keyed by string
///
/// Cloning is cheap; clones share the same entries.
pub struct SwrCache<V> {
    inner: Arc<CacheInner<V>>,
}

struct CacheInner<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    /// Serializes the stale -> refreshing transition across all keys
    refresh_lock: Mutex<()>,
    clock: SharedClock,
}

enum Lookup<V> {
    Fresh(V),
    Stale(V),
    Miss,
}

impl<V> Clone for SwrCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> SwrCache<V>
where
    V: Clone + Send + 'static,
{
    /// Create a cache holding at most `max_entries` keys
    pub fn new(max_entries: usize) -> Result<Self> {
        Self::with_clock(max_entries, system_clock())
    }

    pub fn with_clock(max_entries: usize, clock: SharedClock) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_entries)
            .ok_or_else(|| CacheError::configuration("max_entries must be greater than zero"))?;

        Ok(Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(LruCache::new(capacity)),
                refresh_lock: Mutex::new(()),
                clock,
            }),
        })
    }

    /// Return the value for `key`, loading it with `loader` when needed.
    ///
    /// A stale hit returns immediately and hands `loader` to a detached
    /// background task; its errors are logged and dropped. On a miss or an
    /// expired entry the loader runs here and its error is returned
    /// unchanged, leaving any previous entry in place.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        stale_after: Duration,
        loader: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let now = self.inner.clock.now();
        match self.inner.lookup(key, now) {
            Lookup::Fresh(value) => {
                trace!(key, "Cache hit");
                return Ok(value);
            }
            Lookup::Stale(value) => {
                let Ok(runtime) = Handle::try_current() else {
                    warn!(key, "No tokio runtime for background refresh, serving stale value");
                    return Ok(value);
                };
                if self.inner.begin_refresh(key, now) {
                    debug!(key, "Serving stale value, refreshing in background");
                    self.spawn_refresh(&runtime, key.to_string(), ttl, stale_after, loader);
                } else {
                    trace!(key, "Serving stale value, refresh already in flight");
                }
                return Ok(value);
            }
            Lookup::Miss => {}
        }

        debug!(key, "Cache miss, loading");
        let value = loader().await?;
        self.inner.store(key, value.clone(), ttl, stale_after);
        Ok(value)
    }

    fn spawn_refresh<F, Fut, E>(
        &self,
        runtime: &Handle,
        key: String,
        ttl: Duration,
        stale_after: Duration,
        loader: F,
    ) where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            match loader().await {
                Ok(value) => inner.store_refreshed(&key, value, ttl, stale_after),
                Err(error) => {
                    warn!(key = %key, %error, "Background refresh failed, keeping stale value");
                    inner.abandon_refresh(&key);
                }
            }
        });
    }

    /// Current value without loading or touching LRU order
    pub fn peek(&self, key: &str) -> Option<V> {
        self.inner
            .entries
            .lock()
            .peek(key)
            .map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries.lock().contains(key)
    }

    /// Whether a background refresh for `key` is in flight
    pub fn is_refreshing(&self, key: &str) -> bool {
        self.inner
            .entries
            .lock()
            .peek(key)
            .is_some_and(|entry| entry.is_stale)
    }

    /// Drop `key`, returning whether it was present
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.entries.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.entries.lock().cap().get()
    }
}

impl<V> CacheInner<V>
where
    V: Clone,
{
    fn lookup(&self, key: &str, now: DateTime<Utc>) -> Lookup<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) => match entry.freshness(now) {
                Freshness::Fresh => Lookup::Fresh(entry.value.clone()),
                Freshness::Stale => Lookup::Stale(entry.value.clone()),
                Freshness::Expired => Lookup::Miss,
            },
            None => Lookup::Miss,
        }
    }

    /// Mark `key` as refreshing. Returns false if the entry is gone, no
    /// longer stale, or another refresh already claimed it.
    fn begin_refresh(&self, key: &str, now: DateTime<Utc>) -> bool {
        let _guard = self.refresh_lock.lock();
        let mut entries = self.entries.lock();
        match entries.peek_mut(key) {
            Some(entry) if !entry.is_stale && entry.freshness(now) == Freshness::Stale => {
                entry.is_stale = true;
                true
            }
            _ => false,
        }
    }

    fn abandon_refresh(&self, key: &str) {
        let _guard = self.refresh_lock.lock();
        if let Some(entry) = self.entries.lock().peek_mut(key) {
            entry.is_stale = false;
        }
    }

    /// Replace the entry a background refresh was started for. A key that
    /// was evicted or invalidated meanwhile stays gone.
    fn store_refreshed(&self, key: &str, value: V, ttl: Duration, stale_after: Duration) {
        let now = self.clock.now();
        match self.entries.lock().peek_mut(key) {
            Some(entry) => {
                *entry = CacheEntry::new(value, now, ttl, stale_after);
                debug!(key, "Background refresh complete");
            }
            None => debug!(key, "Entry left the cache during refresh, dropping result"),
        }
    }

    fn store(&self, key: &str, value: V, ttl: Duration, stale_after: Duration) {
        let entry = CacheEntry::new(value, self.clock.now(), ttl, stale_after);
        let evicted = self.entries.lock().push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                debug!(evicted = %evicted_key, "Evicted least recently used entry");
            }
        }
    }
}

impl<V> fmt::Debug for SwrCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.inner.entries.lock();
        f.debug_struct("SwrCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
