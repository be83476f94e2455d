use std::{
    borrow::Borrow,
    collections::{hash_map::RandomState, HashMap},
    fmt,
    hash::{BuildHasher, Hash},
    mem,
    panic::{catch_unwind, AssertUnwindSafe},
};

use log::debug;

use crate::{
    cache::Cache,
    error::{panic_message, CacheError, Result},
    linked_list::{LinkedList, NodeHandle},
    listener::{notify, EvictionListener, EvictionReason},
    snapshot::Snapshot,
    stats::CacheStats,
    weigher::{UnitWeigher, Weigher},
};

/// The most nodes preallocated up front. Weighted caches can have capacities
/// far larger than the number of entries they'll ever hold.
const PREALLOC_LIMIT: u64 = 1024;

/// An element in the eviction queue.
struct Entry<K, V> {
    key: K,
    value: V,
    weight: u64,
}

/// An LRU cache bounded by total entry weight: a HashMap from key to a handle
/// in a Vec-backed linked list, which holds the entries themselves in
/// recency order. Insertion, lookup, and removal are O(1); an insert that
/// pushes the cache over capacity also pays for each entry it evicts.
///
/// This type is single-owner. Wrap it in a
/// [`SharedCache`](crate::SharedCache) to use it across threads.
pub struct LruCache<K, V, S = RandomState>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    index: HashMap<K, NodeHandle, S>,
    eviction_q: LinkedList<Entry<K, V>>,
    size: u64,
    capacity: u64,
    weigher: Box<dyn Weigher<K, V>>,
    listener: Option<Box<dyn EvictionListener<K, V>>>,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    /// Make a new LruCache holding at most `capacity` elements.
    pub fn with_capacity(capacity: u64) -> Result<Self> {
        LruCache::with_capacity_and_hash_builder(capacity, Default::default())
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Makes a new LruCache holding at most `capacity` elements, using the
    /// given hasher for its index.
    pub fn with_capacity_and_hash_builder(capacity: u64, hash_builder: S) -> Result<Self> {
        Self::from_parts(capacity, hash_builder, Box::new(UnitWeigher), None)
    }

    pub(crate) fn from_parts(
        capacity: u64,
        hash_builder: S,
        weigher: Box<dyn Weigher<K, V>>,
        listener: Option<Box<dyn EvictionListener<K, V>>>,
    ) -> Result<Self> {
        check_capacity(capacity)?;

        let prealloc = capacity.min(PREALLOC_LIMIT) as usize;
        debug!("creating lru cache with capacity {}", capacity);

        Ok(LruCache {
            index: HashMap::with_capacity_and_hasher(prealloc, hash_builder),
            eviction_q: LinkedList::with_capacity(prealloc),
            size: 0,
            capacity,
            weigher,
            listener,
            stats: CacheStats::default(),
        })
    }

    /// Iterates over entries from most to least recently used without
    /// promoting anything.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.eviction_q.iter().map(|e| (&e.key, &e.value))
    }

    /// Runs the weigher. Errors, panics, and zero weights all come back as
    /// `WeigherFailure`.
    fn weigh(&self, k: &K, v: &V) -> Result<u64> {
        match catch_unwind(AssertUnwindSafe(|| self.weigher.weigh(k, v))) {
            Ok(Ok(0)) => Err(CacheError::WeigherFailure(
                "entry weight must be at least 1".to_owned(),
            )),
            Ok(Ok(weight)) => Ok(weight),
            Ok(Err(e)) => Err(CacheError::WeigherFailure(e.to_string())),
            Err(panic) => Err(CacheError::WeigherFailure(format!(
                "weigher panicked: {}",
                panic_message(&*panic)
            ))),
        }
    }

    /// Promotes a node and hands back its entry.
    fn touch(&mut self, handle: NodeHandle) -> Option<&mut Entry<K, V>> {
        self.eviction_q.move_to_front(handle);
        self.eviction_q.get_mut(handle)
    }

    /// Evicts the least recently used entry. False if there was none.
    fn evict_lru(&mut self) -> bool {
        let entry = match self.eviction_q.pop_back() {
            Some(entry) => entry,
            None => return false,
        };

        self.index.remove(&entry.key);
        self.size -= entry.weight;
        self.stats.evictions += 1;
        debug!(
            "evicted entry of weight {} ({} of {} in use)",
            entry.weight, self.size, self.capacity
        );
        notify(self.listener.as_deref(), &entry.key, &entry.value, EvictionReason::Size);

        true
    }

    /// Evicts until `weight` more fits under the capacity. The caller has
    /// already checked that `weight <= capacity`.
    fn make_room(&mut self, weight: u64) {
        while self.capacity.saturating_sub(self.size) < weight {
            if !self.evict_lru() {
                break;
            }
        }
    }

    /// An entry that could never fit: whatever the key held goes, and the new
    /// pair is reported as evicted without ever being stored.
    fn reject_oversized(&mut self, k: K, v: V, weight: u64) -> Option<V> {
        let previous = self.index.remove(&k).and_then(|handle| {
            let entry = self.eviction_q.remove(handle)?;
            self.size -= entry.weight;
            notify(self.listener.as_deref(), &entry.key, &entry.value, EvictionReason::Replaced);
            Some(entry.value)
        });

        self.stats.evictions += 1;
        debug!(
            "entry of weight {} can never fit in capacity {}",
            weight, self.capacity
        );
        notify(self.listener.as_deref(), &k, &v, EvictionReason::Size);

        previous
    }
}

impl<K, V, S> Cache<K, V> for LruCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    fn insert(&mut self, k: K, v: V) -> Result<Option<V>> {
        // weigh before touching anything so a failure leaves no trace
        let weight = self.weigh(&k, &v)?;
        self.stats.inserts += 1;

        if weight > self.capacity {
            return Ok(self.reject_oversized(k, v, weight));
        }

        let previous = match self.index.get(&k).copied() {
            Some(handle) => {
                // update the entry in place and make it the youngest; its old
                // weight stops counting before room is made for the new one
                self.eviction_q.move_to_front(handle);
                let old = match self.eviction_q.get_mut(handle) {
                    Some(entry) => {
                        let old = mem::replace(&mut entry.value, v);
                        self.size -= mem::replace(&mut entry.weight, weight);
                        notify(self.listener.as_deref(), &entry.key, &old, EvictionReason::Replaced);
                        old
                    }
                    None => return Ok(None),
                };
                self.make_room(weight);
                Some(old)
            }
            None => {
                self.make_room(weight);
                let handle = self.eviction_q.push_front(Entry {
                    key: k.clone(),
                    value: v,
                    weight,
                });
                self.index.insert(k, handle);
                None
            }
        };

        self.size += weight;

        Ok(previous)
    }

    fn get<Q>(&mut self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(k).map(|v| &*v)
    }

    fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(k).copied() {
            Some(handle) => {
                self.stats.hits += 1;
                self.touch(handle).map(|e| &mut e.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    fn peek<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.index.get(k)?;
        self.eviction_q.get(*handle).map(|e| &e.value)
    }

    fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(k)
    }

    fn remove<Q>(&mut self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.index.remove(k)?;
        let entry = self.eviction_q.remove(handle)?;

        self.size -= entry.weight;
        self.stats.removals += 1;
        notify(self.listener.as_deref(), &entry.key, &entry.value, EvictionReason::Explicit);

        Some(entry.value)
    }

    fn clear(&mut self) {
        while let Some(entry) = self.eviction_q.pop_back() {
            notify(self.listener.as_deref(), &entry.key, &entry.value, EvictionReason::Clear);
        }

        self.index.clear();
        self.eviction_q.clear();
        self.size = 0;
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn len(&self) -> usize {
        self.eviction_q.len()
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn set_capacity(&mut self, capacity: u64) -> Result<()> {
        check_capacity(capacity)?;

        debug!("resizing lru cache from {} to {}", self.capacity, capacity);
        self.capacity = capacity;
        self.trim_to_size(capacity);

        Ok(())
    }

    fn trim_to_size(&mut self, max_size: u64) {
        while self.size > max_size {
            // evict the least recent addition
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }

    fn snapshot(&self) -> Snapshot<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K, V, S> fmt::Debug for LruCache<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.index.len())
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats)
            .finish()
    }
}

fn check_capacity(capacity: u64) -> Result<()> {
    if capacity == 0 {
        return Err(CacheError::InvalidConfiguration(
            "capacity must be positive".to_owned(),
        ));
    }

    Ok(())
}
