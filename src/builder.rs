use std::{
    collections::hash_map::RandomState,
    fmt::Display,
    hash::{BuildHasher, Hash},
};

use crate::{
    error::Result,
    listener::{EvictionListener, EvictionReason, FnListener, TryFnListener},
    lru_cache::LruCache,
    weigher::{FnWeigher, TryFnWeigher, UnitWeigher, Weigher},
};

#[cfg(feature = "shared_cache")]
use crate::shared_cache::SharedCache;

/// Capacity used by [`CacheBuilder::default`]: 4 MiB worth of weight units.
/// With the default weigher that's a limit on entry count, so pair it with a
/// byte-counting weigher to bound memory.
pub const DEFAULT_CAPACITY: u64 = 4 * 1024 * 1024;

/// Builder for configuring an [`LruCache`] or a [`SharedCache`].
///
/// # Example
///
/// ```
/// use weighted_lru::{Cache, CacheBuilder};
///
/// let mut cache = CacheBuilder::new(1024)
///     .weigher(|_k: &u32, v: &Vec<u8>| v.len() as u64)
///     .build()
///     .unwrap();
///
/// cache.insert(1, vec![0; 1000]).unwrap();
/// cache.insert(2, vec![0; 1000]).unwrap();
/// assert!(!cache.contains_key(&1));
/// ```
pub struct CacheBuilder<K, V, S = RandomState> {
    capacity: u64,
    weigher: Box<dyn Weigher<K, V>>,
    listener: Option<Box<dyn EvictionListener<K, V>>>,
    hash_builder: S,
}

impl<K, V> CacheBuilder<K, V, RandomState> {
    /// Create a new builder for a cache holding at most `capacity` weight.
    /// The capacity is checked when the cache is built.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            weigher: Box::new(UnitWeigher),
            listener: None,
            hash_builder: RandomState::new(),
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S> {
    /// Weigh entries with a closure. Returning 0 fails the insert.
    pub fn weigher<F>(self, weigher: F) -> Self
    where
        F: Fn(&K, &V) -> u64 + Send + Sync + 'static,
    {
        self.custom_weigher(FnWeigher(weigher))
    }

    /// Weigh entries with a closure that may fail.
    pub fn try_weigher<F, E>(self, weigher: F) -> Self
    where
        F: Fn(&K, &V) -> std::result::Result<u64, E> + Send + Sync + 'static,
        E: Display,
    {
        self.custom_weigher(TryFnWeigher(weigher))
    }

    /// Weigh entries with any [`Weigher`] implementation.
    pub fn custom_weigher<W>(mut self, weigher: W) -> Self
    where
        W: Weigher<K, V> + 'static,
    {
        self.weigher = Box::new(weigher);
        self
    }

    /// Be told about every entry leaving the cache.
    pub fn on_evict<F>(self, listener: F) -> Self
    where
        F: Fn(&K, &V, EvictionReason) + Send + Sync + 'static,
    {
        self.eviction_listener(FnListener(listener))
    }

    /// Like [`on_evict`](Self::on_evict), for listeners that can fail. Failures
    /// are logged and otherwise ignored.
    pub fn try_on_evict<F, E>(self, listener: F) -> Self
    where
        F: Fn(&K, &V, EvictionReason) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Display,
    {
        self.eviction_listener(TryFnListener(listener))
    }

    /// Use any [`EvictionListener`] implementation.
    pub fn eviction_listener<L>(mut self, listener: L) -> Self
    where
        L: EvictionListener<K, V> + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Use a different hasher for the cache's index.
    pub fn hash_builder<S2>(self, hash_builder: S2) -> CacheBuilder<K, V, S2> {
        CacheBuilder {
            capacity: self.capacity,
            weigher: self.weigher,
            listener: self.listener,
            hash_builder,
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Build the cache. Fails if the capacity is zero.
    pub fn build(self) -> Result<LruCache<K, V, S>> {
        LruCache::from_parts(self.capacity, self.hash_builder, self.weigher, self.listener)
    }

    /// Build the cache wrapped for sharing across threads.
    #[cfg(feature = "shared_cache")]
    pub fn build_shared(self) -> Result<SharedCache<LruCache<K, V, S>, K, V>>
    where
        V: Clone,
    {
        self.build().map(SharedCache::with_cache)
    }
}

impl<K, V> Default for CacheBuilder<K, V, RandomState> {
    /// A builder with [`DEFAULT_CAPACITY`].
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
