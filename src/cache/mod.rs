//! Per-environment memoization of fetched collections.
//!
//! Loading a collection means paging through an entire endpoint, so every collection
//! is fetched at most once per environment per process and then shared. [`Memoized`]
//! is the store behind that: a concurrent map from key to value.
//!
//! Values can also be pushed in directly with [`Memoized::cache_push`]. Offline
//! replays use this to seed collections from a snapshot so that no request is ever
//! issued.
//!
//! # Consistency
//!
//! - Once a key holds a value, later fetches for that key return it unchanged.
//! - A failed fetch stores nothing; the next call fetches again.
//! - Concurrent misses for the same key are not merged; each runs its own fetch and
//!   every caller receives whichever value was stored first.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

/// Hit and miss counters of a [`Memoized`] store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the store
    pub hits: usize,
    /// Lookups that ran the fetch function
    pub misses: usize,
}

/// Concurrent memo table keyed by `K`.
///
/// Values are cloned out on every lookup, so `V` is normally an `Arc`.
#[derive(Debug)]
pub struct Memoized<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, V>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K, V> Default for Memoized<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Memoized<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Return the stored value for `key`, fetching and storing it on a miss.
    ///
    /// If the fetch fails the error is returned and nothing is stored. When two
    /// fetches for the same key race, the value stored first is returned to both.
    ///
    /// # Errors
    ///
    /// Propagates the error of `fetch`.
    pub async fn get_or_try_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = fetch(key.clone()).await?;
        Ok(self.entries.entry(key).or_insert(value).clone())
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Used to seed the store before any fetch happens.
    pub fn cache_push(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Stored value for `key`, without fetching.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Whether `key` holds a value.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit and miss counts of [`get_or_try_fetch`](Self::get_or_try_fetch).
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let value = self.get(key)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }
}
