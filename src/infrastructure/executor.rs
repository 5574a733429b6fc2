//! Request execution with a keyed TTL cache and in-flight de-duplication.
//!
//! Per key the executor moves through `absent -> fetching -> cached` (or back
//! to `absent` when the fetch fails). Concurrent callers for one key share a
//! single fetch; `force_refresh` callers start their own.

use crate::infrastructure::storage::cache::{ErasedValue, MemoryCache};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

type Settled = Result<ErasedValue, ErasedValue>;
type SharedFetch = Shared<BoxFuture<'static, Settled>>;

/// Per-call execution options.
///
/// Defaults: caching off, TTL from the executor, no forced refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub enable_cache: bool,
    /// Falls back to the executor's default TTL when unset.
    pub cache_ttl: Option<Duration>,
    pub force_refresh: bool,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caching enabled with the given TTL.
    pub fn cached(ttl: Duration) -> Self {
        Self::new().with_cache(true).with_ttl(ttl)
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

struct InFlight {
    id: u64,
    future: SharedFetch,
}

struct Inner {
    cache: MemoryCache,
    in_flight: DashMap<String, InFlight>,
    /// Bumped per key on every invalidation. A fetch may only write the
    /// cache if the generation it started under is still current, which
    /// also covers fetches already displaced by a forced refresh.
    generations: DashMap<String, u64>,
    next_id: AtomicU64,
    default_ttl: Duration,
}

impl Inner {
    fn generation(&self, key: &str) -> u64 {
        *self.generations.entry(key.to_string()).or_insert(0)
    }

    fn invalidate_generations(&self, matches: impl Fn(&str) -> bool) {
        for mut entry in self.generations.iter_mut() {
            if matches(entry.key().as_str()) {
                *entry.value_mut() += 1;
            }
        }
    }

    // Runs inside the shared future once the fetch settles. The cache is
    // written before the in-flight record goes so a reader never sees a key
    // as absent in between.
    fn settle(
        &self,
        key: &str,
        id: u64,
        settled: &Settled,
        cache_ttl: Option<Duration>,
        generation: u64,
    ) {
        if let (Ok(value), Some(ttl)) = (settled, cache_ttl) {
            // The generation guard stays held across the write so an
            // invalidation cannot land between the check and the insert
            match self.generations.get(key) {
                Some(current) if *current == generation => {
                    self.cache.insert(key.to_string(), value.clone(), ttl);
                }
                _ => debug!(key, "fetch settled after invalidation, not caching"),
            }
        }
        self.in_flight.remove_if(key, |_, entry| entry.id == id);
    }
}

/// Executes fetches at most once per key at a time, caching results on request.
///
/// Cloning is cheap and every clone shares the same cache and in-flight state.
#[derive(Clone)]
pub struct RequestExecutor {
    inner: Arc<Inner>,
}

impl RequestExecutor {
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_CACHE_TTL)
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: MemoryCache::new(),
                in_flight: DashMap::new(),
                generations: DashMap::new(),
                next_id: AtomicU64::new(0),
                default_ttl,
            }),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Run `fetch` for `key`, or reuse a cached value or an in-flight fetch.
    ///
    /// Errors from `fetch` come back unchanged and are never cached. Every
    /// caller that joined the same in-flight fetch gets a clone of the same
    /// value or error.
    pub async fn execute<T, E, F, Fut>(
        &self,
        fetch: F,
        key: &str,
        options: ExecuteOptions,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        debug_assert!(!key.is_empty(), "cache key must not be empty");
        let read_cache = options.enable_cache && !options.force_refresh;

        if read_cache {
            if let Some(value) = self.inner.cache.get::<T>(key) {
                debug!(key, "cache hit");
                return Ok(value);
            }
        }

        // The entry guard holds the key's shard lock, which makes
        // "join or register" atomic.
        let (shared, own_fetch) = match self.inner.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) if !options.force_refresh => {
                debug!(key, "joining in-flight request");
                (existing.get().future.clone(), Some(fetch))
            }
            entry => {
                // A fetch may have settled between the first lookup and the lock
                if read_cache {
                    if let Some(value) = self.inner.cache.get::<T>(key) {
                        debug!(key, "cache hit");
                        return Ok(value);
                    }
                }

                let in_flight = self.start(fetch, key, options);
                let future = in_flight.future.clone();
                match entry {
                    Entry::Occupied(mut replaced) => {
                        debug!(key, "forced refresh replaces in-flight request");
                        replaced.insert(in_flight);
                    }
                    Entry::Vacant(vacant) => {
                        debug!(key, "starting fetch");
                        vacant.insert(in_flight);
                    }
                }
                (future, None)
            }
        };

        match (downcast::<T, E>(shared.await), own_fetch) {
            (Some(result), _) => result,
            (None, Some(fetch)) => {
                warn!(
                    key,
                    "in-flight request carries a different payload type, fetching separately"
                );
                fetch().await
            }
            (None, None) => unreachable!("a started fetch settles with its own payload type"),
        }
    }

    fn start<T, E, F, Fut>(&self, fetch: F, key: &str, options: ExecuteOptions) -> InFlight
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let generation = self.inner.generation(key);
        // A forced refresh overwrites the entry even when caching is off for the call
        let cache_ttl = (options.enable_cache || options.force_refresh)
            .then(|| options.cache_ttl.unwrap_or(self.inner.default_ttl));

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let key = key.to_string();

        let future = async move {
            let settled: Settled = match fetch().await {
                Ok(value) => Ok(Arc::new(value) as ErasedValue),
                Err(error) => Err(Arc::new(error) as ErasedValue),
            };
            if let Some(inner) = inner.upgrade() {
                inner.settle(&key, id, &settled, cache_ttl, generation);
            }
            settled
        }
        .boxed()
        .shared();

        InFlight { id, future }
    }

    /// Invalidate every cached or in-flight key matching one of `prefixes`.
    ///
    /// A key matches prefix `p` when it equals `p` or starts with `p`
    /// followed by `_`, so `fetchTeams` clears `fetchTeams_<digest>` but
    /// `fetchTeam_5` leaves `fetchTeam_50` alone. Callers still waiting on a
    /// cleared in-flight fetch get its result, but it is not cached, even
    /// when a forced refresh had already displaced that fetch.
    pub fn clear_cache<S: AsRef<str>>(&self, prefixes: &[S]) {
        let matches = |key: &str| {
            prefixes
                .iter()
                .any(|prefix| key_matches_prefix(key, prefix.as_ref()))
        };

        // Generations first: a fetch settling after this point cannot write
        self.inner.invalidate_generations(&matches);
        let removed = self.inner.cache.remove_matching(&matches);
        let mut cancelled = 0usize;
        self.inner.in_flight.retain(|key, _| {
            if matches(key.as_str()) {
                cancelled += 1;
                false
            } else {
                true
            }
        });

        debug!(removed, in_flight = cancelled, "cache invalidated");
    }

    /// Drop every cached value and in-flight record.
    pub fn clear_all(&self) {
        self.inner.invalidate_generations(|_| true);
        self.inner.cache.clear();
        self.inner.in_flight.clear();
    }

    pub fn purge_expired(&self) -> usize {
        self.inner.cache.purge_expired()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.inner.cache.contains_fresh(key)
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner.in_flight.contains_key(key)
    }

    pub fn cached_len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.len()
    }
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

pub fn key_matches_prefix(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => !prefix.is_empty() && (rest.is_empty() || rest.starts_with('_')),
        None => false,
    }
}

fn downcast<T, E>(settled: Settled) -> Option<Result<T, E>>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    match settled {
        Ok(value) => value.downcast_ref::<T>().cloned().map(Ok),
        Err(error) => error.downcast_ref::<E>().cloned().map(Err),
    }
}
