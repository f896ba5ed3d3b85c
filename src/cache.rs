use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Key -> value cache where every entry expires `ttl` after it was stored.
///
/// Concurrent misses on the same key are not deduplicated: both callers run
/// `compute` and the last writer wins. Only `Ok` results are stored, so a
/// negative answer is cached as long as the provider returns it as a value.
pub struct TtlCache<K, V> {
    name: &'static str,
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // `name` labels the cache in metrics
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the live value for `key`, or runs `compute` and stores its
    /// successful result.
    pub fn get_or_compute<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_or_compute_at(key, Instant::now(), compute)
    }

    pub(crate) fn get_or_compute_at<E, F>(
        &self,
        key: K,
        now: Instant,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        // the shard guard must be released before compute runs
        if let Some(entry) = self.entries.get(&key) {
            if entry.is_live(now, self.ttl) {
                CACHE_HITS.with_label_values(&[self.name]).inc();
                return Ok(entry.value.clone());
            }
        }
        CACHE_MISSES.with_label_values(&[self.name]).inc();

        let value = compute()?;
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                inserted_at: now,
            },
        );
        CACHE_SIZE
            .with_label_values(&[self.name])
            .set(self.entries.len() as f64);

        Ok(value)
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
        CACHE_SIZE.with_label_values(&[self.name]).set(0.0);
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now, self.ttl));
        let after = self.entries.len();
        CACHE_SIZE.with_label_values(&[self.name]).set(after as f64);
        before.saturating_sub(after)
    }
}
