//! Keyed read cache with a staleness window and per-key request coalescing.
//!
//! - Within the window a cached value is returned without calling the fetcher.
//! - Past the window the stale value is returned immediately and a background
//!   revalidation is started (stale-while-revalidate).
//! - Concurrent reads of one key share a single in-flight fetch, so every
//!   caller sees the same value or the same error.
//! - Each fetch is retried once before its error is surfaced.
//! - `invalidate` marks an entry stale; the next read waits for the network
//!   instead of serving the old value. A fetch that was already in flight
//!   when the invalidation landed may store its value, but never as fresh,
//!   and the refetch only starts once it has finished, so a key never has
//!   two network calls running at once.

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::gateway::GatewayError;

// ============================================================================
// Keys and Status
// ============================================================================

/// Logical identifier of a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    AllPosts,
    Post(String),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::AllPosts => f.write_str("blogs"),
            QueryKey::Post(id) => write!(f, "blogs/{id}"),
        }
    }
}

/// Observable state of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never requested (or evicted).
    Idle,
    /// First fetch in flight, nothing cached yet.
    Loading,
    /// A value is cached (possibly stale, possibly revalidating).
    Ready,
    /// The last fetch failed and no value is cached.
    Failed(GatewayError),
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, GatewayError>>>;

struct Entry<V> {
    value: Option<V>,
    /// `None` means stale: never fetched successfully, or invalidated since.
    fetched_at: Option<Instant>,
    error: Option<GatewayError>,
    /// Running fetch and the generation it was started for.
    in_flight: Option<(u64, SharedFetch<V>)>,
    /// Bumped by `invalidate`; a finishing fetch from an older generation is not fresh.
    generation: u64,
    /// Bumped on every successful write.
    revision: u64,
}

impl<V> Entry<V> {
    fn new() -> Self {
        Self {
            value: None,
            fetched_at: None,
            error: None,
            in_flight: None,
            generation: 0,
            revision: 0,
        }
    }
}

// ============================================================================
// Query Cache
// ============================================================================

/// Process-wide read cache, cheap to clone (clones share state).
pub struct QueryCache<V> {
    inner: Arc<Mutex<LruCache<QueryKey, Entry<V>>>>,
    stale_after: Duration,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            stale_after: self.stale_after,
        }
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// `capacity` bounds the number of keys; zero is treated as one.
    pub fn new(stale_after: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
            stale_after,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<QueryKey, Entry<V>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value regardless of staleness, without touching LRU order.
    pub fn get(&self, key: &QueryKey) -> Option<V> {
        self.lock().peek(key).and_then(|e| e.value.clone())
    }

    /// True when a value is cached and still inside the staleness window.
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.lock()
            .peek(key)
            .and_then(|e| e.fetched_at)
            .is_some_and(|at| at.elapsed() < self.stale_after)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock().peek(key).is_some_and(|e| e.in_flight.is_some())
    }

    /// Counter bumped whenever a new value lands for `key`.
    pub fn revision(&self, key: &QueryKey) -> u64 {
        self.lock().peek(key).map_or(0, |e| e.revision)
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        let cache = self.lock();
        let Some(entry) = cache.peek(key) else {
            return QueryStatus::Idle;
        };
        if entry.value.is_some() {
            QueryStatus::Ready
        } else if entry.in_flight.is_some() {
            QueryStatus::Loading
        } else if let Some(err) = &entry.error {
            QueryStatus::Failed(err.clone())
        } else {
            QueryStatus::Idle
        }
    }

    /// Store `value` as fresh.
    pub fn set(&self, key: QueryKey, value: V) {
        let mut cache = self.lock();
        let entry = cache.get_or_insert_mut(key, Entry::new);
        entry.value = Some(value);
        entry.fetched_at = Some(Instant::now());
        entry.error = None;
        entry.revision += 1;
    }

    /// Mark `key` stale so the next read goes to the network.
    ///
    /// A fetch already in flight keeps running for its current awaiters;
    /// the next read queues a new one behind it.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut cache = self.lock();
        if let Some(entry) = cache.peek_mut(key) {
            entry.fetched_at = None;
            entry.generation = entry.generation.wrapping_add(1);
            tracing::debug!(key = %key, "Invalidated cache entry");
        }
    }

    pub fn remove(&self, key: &QueryKey) {
        self.lock().pop(key);
    }

    /// Read `key` through the cache.
    ///
    /// `fetcher` may be called up to twice per network round (one retry).
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<V, GatewayError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, GatewayError>> + Send + 'static,
    {
        let (shared, stale, started) = {
            let mut cache = self.lock();
            let entry = cache.get_or_insert_mut(key.clone(), Entry::new);

            if let (Some(value), Some(at)) = (&entry.value, entry.fetched_at) {
                if at.elapsed() < self.stale_after {
                    tracing::debug!(key = %key, "Cache hit");
                    return Ok(value.clone());
                }
            }

            let (shared, started) = match entry.in_flight.clone() {
                Some((generation, existing)) if generation == entry.generation => {
                    tracing::debug!(key = %key, "Joining in-flight request");
                    (existing, false)
                }
                superseded => {
                    let after = superseded.map(|(_, fut)| fut);
                    tracing::debug!(
                        key = %key,
                        stale = entry.value.is_some(),
                        queued = after.is_some(),
                        "Cache miss, fetching"
                    );
                    let generation = entry.generation;
                    let fut = shared_fetch(Arc::clone(&self.inner), key, generation, after, fetcher);
                    entry.in_flight = Some((generation, fut.clone()));
                    (fut, true)
                }
            };
            // Only a value that aged out is served stale; an invalidated one is not.
            let stale = entry.fetched_at.and(entry.value.clone());
            (shared, stale, started)
        };

        match stale {
            Some(stale) => {
                if started {
                    tokio::spawn(shared);
                }
                Ok(stale)
            }
            None => shared.await,
        }
    }
}

/// Build the shared fetch future for one key. It writes its own result back.
///
/// With `after` set, the network call waits until that superseded fetch is done.
fn shared_fetch<V, F, Fut>(
    inner: Arc<Mutex<LruCache<QueryKey, Entry<V>>>>,
    key: QueryKey,
    generation: u64,
    after: Option<SharedFetch<V>>,
    fetcher: F,
) -> SharedFetch<V>
where
    V: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, GatewayError>> + Send + 'static,
{
    async move {
        if let Some(previous) = after {
            // Its outcome is stale either way.
            let _ = previous.await;
        }
        let result = match fetcher().await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Read failed, retrying once");
                fetcher().await
            }
        };

        let mut cache = inner.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.get_or_insert_mut(key.clone(), Entry::new);
        let current = entry.generation == generation;
        if entry.in_flight.as_ref().is_some_and(|(g, _)| *g == generation) {
            entry.in_flight = None;
        }
        match &result {
            Ok(value) if current => {
                entry.value = Some(value.clone());
                entry.fetched_at = Some(Instant::now());
                entry.error = None;
                entry.revision += 1;
            }
            Ok(value) => {
                // Superseded by an invalidation: keep as a stale fallback only.
                if entry.value.is_none() {
                    entry.value = Some(value.clone());
                    entry.revision += 1;
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Read failed after retry");
                if current {
                    entry.error = Some(e.clone());
                }
            }
        }
        result
    }
    .boxed()
    .shared()
}

// ============================================================================
// Tests
// ============================================================================
