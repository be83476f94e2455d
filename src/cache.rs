use std::{borrow::Borrow, hash::Hash};

use crate::{
    error::{CacheError, Result},
    snapshot::Snapshot,
    stats::CacheStats,
};

/// Describes what a cache is: a weight-bounded map that forgets its least
/// recently used entries when it runs out of room.
pub trait Cache<K, V>
where
    K: Eq + Hash,
{
    /// Push a new element into the Cache, which may evict the oldest items if
    /// the cache goes over capacity. Returns the previous value in the cache if
    /// the key already had a value there.
    ///
    /// Fails with [`CacheError::WeigherFailure`] if the entry can't be
    /// weighed, in which case the cache is left untouched. An entry heavier
    /// than the whole capacity is never stored: it is reported to the
    /// listener as evicted, and any old value under its key is dropped.
    fn insert(&mut self, k: K, v: V) -> Result<Option<V>>;

    /// Get an item from the Cache. This also makes the item the youngest item
    /// in the cache and the least eligible for eviction.
    fn get<Q>(&mut self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Get a mutable reference to an item from the cache. This also makes the
    /// item the youngest item in the cache and the least eligible for eviction.
    fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Look at an item without touching its place in the eviction order.
    fn peek<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Whether the key is present. Doesn't touch the eviction order.
    fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.peek(k).is_some()
    }

    /// Bust a move, returning whatever was there.
    fn remove<Q>(&mut self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Clears the cache entirely.
    fn clear(&mut self);

    /// The total weight of everything in the cache right now. With the default
    /// weigher this is the same as [`len`](Cache::len).
    fn size(&self) -> u64;

    /// The number of items stored in the cache right now.
    fn len(&self) -> usize;

    /// True when nothing is stored.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The maximum total weight the cache will hold.
    fn capacity(&self) -> u64;

    /// Changes the capacity, evicting least recently used entries if the
    /// cache is now over it.
    fn set_capacity(&mut self, capacity: u64) -> Result<()>;

    /// Evicts least recently used entries until the total weight is at most
    /// `max_size`.
    fn trim_to_size(&mut self, max_size: u64);

    /// Hit, miss, insert, eviction, and removal counts so far.
    fn stats(&self) -> CacheStats;

    /// Copies every entry out, most recently used first. Doesn't touch the
    /// eviction order.
    fn snapshot(&self) -> Snapshot<K, V>
    where
        K: Clone,
        V: Clone;

    /// Inserts only if the key isn't already there. If it is, the existing
    /// value is returned and neither it nor its place in the eviction order
    /// changes.
    fn put_if_absent(&mut self, k: K, v: V) -> Result<Option<&V>> {
        if self.contains_key(&k) {
            return Ok(self.peek(&k));
        }

        self.insert(k, v)?;
        Ok(None)
    }

    /// Insert for callers holding possibly-absent keys or values. Absence is
    /// an error, never a silent no-op.
    fn insert_nullable(&mut self, k: Option<K>, v: Option<V>) -> Result<Option<V>> {
        match (k, v) {
            (Some(k), Some(v)) => self.insert(k, v),
            _ => Err(CacheError::NullKeyOrValue),
        }
    }

    /// Inserts every pair in order, stopping at the first failure. Pairs
    /// before the failure stay inserted.
    fn insert_all<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in entries {
            self.insert(k, v)?;
        }

        Ok(())
    }

    /// Removes the entry only if its current value equals `expected`.
    fn remove_if_eq<Q>(&mut self, k: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        if self.peek(k) == Some(expected) {
            self.remove(k).is_some()
        } else {
            false
        }
    }

    /// Replaces the value only if the key is already present. Never inserts.
    fn replace(&mut self, k: K, v: V) -> Result<Option<V>> {
        if self.contains_key(&k) {
            self.insert(k, v)
        } else {
            Ok(None)
        }
    }

    /// Swaps in `new` only if the current value equals `expected`. A
    /// successful swap promotes the entry like an insert does.
    fn replace_if_eq(&mut self, k: K, expected: &V, new: V) -> Result<bool>
    where
        V: PartialEq,
    {
        if self.peek(&k) != Some(expected) {
            return Ok(false);
        }

        self.insert(k, new)?;
        Ok(true)
    }

    /// Loads a snapshot back in. Entries are inserted least recently used
    /// first so the cache ends up in the snapshot's order. Existing entries
    /// are kept unless a snapshot key overwrites them.
    fn restore(&mut self, snapshot: Snapshot<K, V>) -> Result<()> {
        self.insert_all(snapshot.into_entries().into_iter().rev())
    }
}
