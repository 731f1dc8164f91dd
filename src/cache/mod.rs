//! Shared result cache with per-entry TTL and a capacity ceiling.
//!
//! One [`ResultCache`] is created per process and injected into every analyzer
//! (`Arc<ResultCache<_>>`). Analyzers never own entries exclusively: keys are
//! scoped by graph id, and the runtime invalidates a graph's results through
//! [`ResultCache::clear_pattern`] when that graph changes.
//!
//! ## Expiry
//!
//! - Lazy: `get`/`has` treat an entry older than its TTL as absent and remove it.
//! - Background: when created inside a tokio runtime, a sweep task removes every
//!   expired entry on a fixed interval. [`ResultCache::destroy`] stops it.
//!
//! ## Eviction
//!
//! When an insert pushes the entry count above `max_entries`, the entry with the
//! oldest creation time is removed. Reads do not refresh entries, so this is
//! insertion-order eviction, not LRU.

mod key;

pub use key::{CacheKey, KeyPattern, Operation, OperationKind};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Configuration & entries
// ============================================================================

/// Runtime settings of a [`ResultCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL applied by [`ResultCache::set`] (default: 5 minutes)
    pub default_ttl: Duration,
    /// Maximum number of entries before eviction (default: 1000)
    pub max_entries: usize,
    /// Interval of the background expiry sweep (default: 60 seconds)
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            max_entries: 1000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// A cached value with its creation time and TTL.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
    /// Insertion sequence, orders entries created within the same clock tick
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration, seq: u64) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            seq,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Snapshot of cache usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries currently stored (expired ones included until touched or swept)
    pub size: usize,
    /// Estimated footprint: key sizes plus the JSON-encoded length of every value
    pub approximate_memory_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0.0 before the first lookup
    pub hit_rate: f64,
}

// ============================================================================
// ResultCache
// ============================================================================

/// Concurrent key/value store with TTL expiry and insertion-order eviction.
pub struct ResultCache<V> {
    entries: DashMap<CacheKey, CacheEntry<V>>,
    config: CacheConfig,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    shutdown: CancellationToken,
    destroyed: AtomicBool,
}

impl<V> ResultCache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    /// Create a cache and, when a tokio runtime is available, start its sweep task.
    ///
    /// The sweep task only holds a weak reference: dropping the last `Arc` ends it,
    /// as does [`destroy`](Self::destroy).
    pub fn new(config: CacheConfig) -> Arc<Self> {
        let cache = Arc::new(Self {
            entries: DashMap::new(),
            config,
            next_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            destroyed: AtomicBool::new(false),
        });

        let interval = cache.config.sweep_interval;
        if interval.is_zero() {
            tracing::debug!("Cache sweep disabled (zero interval), expiry is lazy only");
            return cache;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(Self::sweep_loop(
                    Arc::downgrade(&cache),
                    interval,
                    cache.shutdown.clone(),
                ));
                tracing::debug!("Cache sweep started (every {:?})", interval);
            }
            Err(_) => {
                tracing::debug!("No tokio runtime, cache sweep not started; expiry is lazy only");
            }
        }
        cache
    }

    /// Background loop: purge expired entries until cancelled or dropped.
    async fn sweep_loop(cache: Weak<Self>, period: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(cache) = cache.upgrade() else {
                        break;
                    };
                    let removed = cache.purge_expired();
                    if removed > 0 {
                        tracing::debug!("Cache sweep removed {} expired entries", removed);
                    }
                }
            }
        }
        tracing::debug!("Cache sweep stopped");
    }

    /// Insert or overwrite `key` with the default TTL.
    pub fn set(&self, key: CacheKey, value: V) {
        self.set_with_ttl(key, value, self.config.default_ttl);
    }

    /// Insert or overwrite `key` with an explicit TTL, evicting the oldest entry
    /// if the cache grows past `max_entries`.
    pub fn set_with_ttl(&self, key: CacheKey, value: V, ttl: Duration) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key, CacheEntry::new(value, ttl, seq));

        while self.entries.len() > self.config.max_entries {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    /// Remove the entry with the smallest creation time. Returns false if empty.
    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| (entry.created_at, entry.seq))
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => {
                tracing::debug!("Evicting oldest cache entry {}", key);
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Look up `key`. Expired entries count as misses and are removed.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        // None = missing, Some(None) = expired, Some(Some(v)) = hit
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired());
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether a live entry exists for `key`. Same expiry semantics as `get`.
    pub fn has(&self, key: &CacheKey) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        !expired
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every entry whose key matches `pattern`. Returns how many were removed.
    pub fn clear_pattern(&self, pattern: &KeyPattern) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if pattern.matches(key) {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            tracing::debug!("Cleared {} cache entries matching {:?}", removed, pattern);
        }
        removed
    }

    /// One sweep pass: remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Number of stored entries, expired ones included until touched or swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        let approximate_memory_bytes = self
            .entries
            .iter()
            .map(|entry| {
                let value_bytes = serde_json::to_vec(&entry.value)
                    .map(|bytes| bytes.len())
                    .unwrap_or(0);
                entry.key().approximate_size() + std::mem::size_of::<CacheEntry<V>>() + value_bytes
            })
            .sum();

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        };

        CacheStats {
            size: self.entries.len(),
            approximate_memory_bytes,
            hits,
            misses,
            hit_rate,
        }
    }

    /// Stop the sweep task and drop every entry. Safe to call more than once.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Result cache already destroyed");
            return;
        }
        self.shutdown.cancel();
        let size = self.entries.len();
        self.entries.clear();
        tracing::debug!("Result cache destroyed ({} entries released)", size);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl<V> Drop for ResultCache<V> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================
