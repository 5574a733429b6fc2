// In-memory TTL cache implementation using DashMap
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Type-erased payload shared between the cache and in-flight requests.
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub struct CacheEntry {
    pub value: ErasedValue,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: ErasedValue, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Thread-safe in-memory cache with per-entry TTL
///
/// Expired entries are never returned; they are evicted lazily when looked up
/// or in bulk by [`MemoryCache::purge_expired`].
pub struct MemoryCache {
    map: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Fresh value for `key`, if one exists and holds a `T`.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        let now = Instant::now();
        let fresh = {
            let entry = self.map.get(key)?;
            entry.is_fresh(now).then(|| entry.value.clone())
        };

        match fresh {
            Some(value) => {
                let typed = value.downcast_ref::<T>().cloned();
                if typed.is_none() {
                    tracing::debug!(key, "cached value has a different type, treating as miss");
                }
                typed
            }
            None => {
                // Only drop it if nobody refreshed the entry in the meantime
                self.map.remove_if(key, |_, entry| !entry.is_fresh(now));
                None
            }
        }
    }

    pub fn insert(&self, key: String, value: ErasedValue, ttl: Duration) {
        self.map.insert(key, CacheEntry::new(value, ttl));
    }

    pub fn contains_fresh(&self, key: &str) -> bool {
        let now = Instant::now();
        self.map
            .get(key)
            .map(|entry| entry.is_fresh(now))
            .unwrap_or(false)
    }

    /// Remove every entry whose key satisfies `matches`, returning how many went.
    pub fn remove_matching(&self, matches: impl Fn(&str) -> bool) -> usize {
        let mut removed = 0;
        self.map.retain(|key, _| {
            if matches(key.as_str()) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.map.retain(|_, entry| {
            let keep = entry.is_fresh(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}
