//! Weighers assign each entry a cost. The cache keeps the sum of all entry
//! weights at or under its capacity, so with the default [`UnitWeigher`] the
//! capacity is simply a maximum entry count, and with a byte-counting weigher
//! it bounds memory instead.

use std::fmt::Display;

use crate::error::BoxError;

/// Computes the weight of a cache entry.
///
/// Called exactly once per insert, before the cache is touched. A weight of
/// zero, an `Err`, or a panic rejects the insert with
/// [`CacheError::WeigherFailure`](crate::CacheError::WeigherFailure).
/// Weighers must not call back into the cache; a
/// [`SharedCache`](crate::SharedCache) turns that into the same failure.
pub trait Weigher<K, V>: Send + Sync {
    fn weigh(&self, key: &K, value: &V) -> Result<u64, BoxError>;
}

/// Every entry weighs exactly 1. This is the default weigher.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnitWeigher;

impl<K, V> Weigher<K, V> for UnitWeigher {
    #[inline]
    fn weigh(&self, _key: &K, _value: &V) -> Result<u64, BoxError> {
        Ok(1)
    }
}

/// A weigher backed by an infallible closure.
pub struct FnWeigher<F>(pub F);

impl<K, V, F> Weigher<K, V> for FnWeigher<F>
where
    F: Fn(&K, &V) -> u64 + Send + Sync,
{
    #[inline]
    fn weigh(&self, key: &K, value: &V) -> Result<u64, BoxError> {
        Ok((self.0)(key, value))
    }
}

/// A weigher backed by a closure that may fail.
pub struct TryFnWeigher<F>(pub F);

impl<K, V, E, F> Weigher<K, V> for TryFnWeigher<F>
where
    F: Fn(&K, &V) -> Result<u64, E> + Send + Sync,
    E: Display,
{
    fn weigh(&self, key: &K, value: &V) -> Result<u64, BoxError> {
        (self.0)(key, value).map_err(|e| e.to_string().into())
    }
}
