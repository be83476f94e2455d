use parking_lot::RwLock;
use std::{borrow::Borrow, cell::RefCell, hash::Hash, marker::PhantomData, sync::Arc};

use crate::{cache::Cache, error::Result, snapshot::Snapshot, stats::CacheStats};

thread_local! {
    /// Caches whose lock the current thread is inside of, by address.
    static HELD: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

/// Marks a cache as locked by this thread for as long as it lives. Trying to
/// mark the same cache twice means a weigher or eviction listener called back
/// into the cache it's running under, which would otherwise deadlock, so it
/// panics instead.
struct HeldMark(usize);

impl HeldMark {
    fn acquire(id: usize) -> Self {
        let reentered = HELD.with(|held| {
            let mut held = held.borrow_mut();
            if held.contains(&id) {
                true
            } else {
                held.push(id);
                false
            }
        });

        if reentered {
            panic!("SharedCache re-entered from a weigher or eviction listener");
        }

        HeldMark(id)
    }
}

impl Drop for HeldMark {
    fn drop(&mut self) {
        let id = self.0;
        HELD.with(|held| held.borrow_mut().retain(|h| *h != id));
    }
}

/// Wrapper for a Cache which is shareable across thread boundaries. Clones
/// share the same underlying cache.
///
/// There is one lock for the whole cache. Anything that changes the contents
/// or the eviction order, `get` included, takes it exclusively; `peek`,
/// `contains_key`, sizes, stats, and snapshots share it.
pub struct SharedCache<C, K, V>(Arc<RwLock<C>>, PhantomData<K>, PhantomData<V>)
where
    C: Cache<K, V>,
    K: Eq + Hash,
    V: Clone;

impl<C, K, V> SharedCache<C, K, V>
where
    C: Cache<K, V>,
    K: Eq + Hash,
    V: Clone,
{
    /// Wraps a cache into a shared cache accessor, making it safe to move
    /// across thread boundaries. Enforces an additional constraint of Clone on
    /// values.
    pub fn with_cache(cache: C) -> Self {
        Self(Arc::from(RwLock::from(cache)), PhantomData, PhantomData)
    }

    fn write<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let _mark = HeldMark::acquire(self.id());
        let mut cache = self.0.write();
        f(&mut *cache)
    }

    fn read<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        let _mark = HeldMark::acquire(self.id());
        let cache = self.0.read();
        f(&*cache)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Inserts an item into the cache, returning the value it replaced.
    pub fn insert(&self, k: K, v: V) -> Result<Option<V>> {
        self.write(|c| c.insert(k, v))
    }

    /// Inserts only if the key is absent; otherwise returns a copy of the
    /// value already there without promoting it.
    pub fn put_if_absent(&self, k: K, v: V) -> Result<Option<V>> {
        self.write(|c| c.put_if_absent(k, v).map(|existing| existing.cloned()))
    }

    /// Insert for callers holding possibly-absent keys or values.
    pub fn insert_nullable(&self, k: Option<K>, v: Option<V>) -> Result<Option<V>> {
        self.write(|c| c.insert_nullable(k, v))
    }

    /// Inserts every pair under a single lock, stopping at the first failure.
    pub fn insert_all<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.write(|c| c.insert_all(entries))
    }

    /// Get an item from the cache, promoting it. This clones it to minimize
    /// the lock time of the cache.
    pub fn get<Q>(&self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write(|c| c.get(k).cloned())
    }

    /// Get a copy of an item without promoting it.
    pub fn peek<Q>(&self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read(|c| c.peek(k).cloned())
    }

    /// Whether the key is present. Doesn't promote it.
    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read(|c| c.contains_key(k))
    }

    /// Remove an item from the cache, returning the removed item if it existed.
    pub fn remove<Q>(&self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write(|c| c.remove(k))
    }

    /// Removes the item only if it currently equals `expected`.
    pub fn remove_if_eq<Q>(&self, k: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        self.write(|c| c.remove_if_eq(k, expected))
    }

    /// Replaces the item only if it is present.
    pub fn replace(&self, k: K, v: V) -> Result<Option<V>> {
        self.write(|c| c.replace(k, v))
    }

    /// Swaps in `new` only if the item currently equals `expected`.
    pub fn replace_if_eq(&self, k: K, expected: &V, new: V) -> Result<bool>
    where
        V: PartialEq,
    {
        self.write(|c| c.replace_if_eq(k, expected, new))
    }

    /// Clears the cache.
    pub fn clear(&self) {
        self.write(|c| c.clear())
    }

    /// The total weight of the cache at present.
    pub fn size(&self) -> u64 {
        self.read(|c| c.size())
    }

    /// The number of elements in the cache at present.
    pub fn len(&self) -> usize {
        self.read(|c| c.len())
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.read(|c| c.is_empty())
    }

    /// The maximum total weight the cache will hold.
    pub fn capacity(&self) -> u64 {
        self.read(|c| c.capacity())
    }

    /// Changes the capacity, evicting whatever no longer fits.
    pub fn set_capacity(&self, capacity: u64) -> Result<()> {
        self.write(|c| c.set_capacity(capacity))
    }

    /// Evicts least recently used entries until at most `max_size` remains.
    pub fn trim_to_size(&self, max_size: u64) {
        self.write(|c| c.trim_to_size(max_size))
    }

    /// Counters since the cache was created.
    pub fn stats(&self) -> CacheStats {
        self.read(|c| c.stats())
    }

    /// A consistent copy of every entry, most recently used first.
    pub fn snapshot(&self) -> Snapshot<K, V>
    where
        K: Clone,
    {
        self.read(|c| c.snapshot())
    }

    /// Keys at this moment, most recently used first.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.snapshot().into_iter().map(|(k, _)| k).collect()
    }

    /// Values at this moment, most recently used first.
    pub fn values(&self) -> Vec<V>
    where
        K: Clone,
    {
        self.snapshot().into_iter().map(|(_, v)| v).collect()
    }

    /// Loads a snapshot in under a single lock.
    pub fn restore(&self, snapshot: Snapshot<K, V>) -> Result<()> {
        self.write(|c| c.restore(snapshot))
    }
}

impl<C, K, V> Clone for SharedCache<C, K, V>
where
    C: Cache<K, V>,
    K: Eq + Hash,
    V: Clone,
{
    fn clone(&self) -> Self {
        SharedCache(self.0.clone(), PhantomData, PhantomData)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, OnceLock,
        },
        thread,
    };

    use crate::{CacheBuilder, CacheError, EvictionReason, LruCache, SharedCache};

    type SharedLru = SharedCache<LruCache<usize, usize>, usize, usize>;

    #[test]
    fn readme_snippet() {
        let cache: SharedLru = SharedCache::with_cache(LruCache::with_capacity(1).unwrap());
        cache.insert(1, 1).unwrap();

        let thread_cache = cache.clone();
        let r = thread::spawn(move || thread_cache.get(&1)).join();

        assert_eq!(Some(1), r.unwrap());
    }

    #[test]
    fn test_map_surface() {
        let cache: SharedLru = SharedCache::with_cache(LruCache::with_capacity(2).unwrap());

        assert_eq!(None, cache.put_if_absent(1, 10).unwrap());
        assert_eq!(Some(10), cache.put_if_absent(1, 11).unwrap());
        assert_eq!(Some(10), cache.replace(1, 12).unwrap());
        assert_eq!(None, cache.replace(2, 20).unwrap());
        assert!(cache.replace_if_eq(1, &12, 13).unwrap());
        assert!(!cache.remove_if_eq(&1, &12));
        assert_eq!(Some(13), cache.peek(&1));
        assert!(cache.contains_key(&1));
        assert_eq!(
            Err(CacheError::NullKeyOrValue),
            cache.insert_nullable(Some(3), None)
        );

        cache.insert(2, 20).unwrap();
        assert_eq!(vec![2, 1], cache.keys());
        assert_eq!(vec![20, 13], cache.values());
        assert_eq!(2, cache.size());
        assert_eq!(2, cache.capacity());

        assert!(cache.remove_if_eq(&1, &13));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let cache: SharedLru = SharedCache::with_cache(LruCache::with_capacity(3).unwrap());
        cache.insert_all(vec![(1, 1), (2, 2), (3, 3)]).unwrap();
        cache.get(&1);

        let copy: SharedLru = SharedCache::with_cache(LruCache::with_capacity(3).unwrap());
        copy.restore(cache.snapshot()).unwrap();

        assert_eq!(vec![1, 3, 2], copy.keys());
    }

    #[test]
    fn test_set_capacity() {
        let cache: SharedLru = SharedCache::with_cache(LruCache::with_capacity(3).unwrap());
        cache.insert_all(vec![(1, 1), (2, 2), (3, 3)]).unwrap();

        cache.set_capacity(1).unwrap();
        assert_eq!(vec![3], cache.keys());
        assert_eq!(2, cache.stats().evictions);

        cache.trim_to_size(0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_listener_reentry_is_rejected() {
        let handle: Arc<OnceLock<SharedCache<LruCache<usize, usize>, usize, usize>>> =
            Arc::default();
        let rejected = Arc::new(AtomicBool::new(false));

        let listener_handle = handle.clone();
        let listener_rejected = rejected.clone();
        let cache = CacheBuilder::new(1)
            .on_evict(move |_k: &usize, _v: &usize, reason: EvictionReason| {
                if reason != EvictionReason::Size {
                    return;
                }
                if let Some(cache) = listener_handle.get() {
                    let attempt = catch_unwind(AssertUnwindSafe(|| cache.len()));
                    listener_rejected.store(attempt.is_err(), Ordering::SeqCst);
                }
            })
            .build_shared()
            .unwrap();
        assert!(handle.set(cache.clone()).is_ok());

        cache.insert(1, 1).unwrap();
        cache.insert(2, 2).unwrap();

        assert!(rejected.load(Ordering::SeqCst));
        assert_eq!(vec![2], cache.keys());

        // the lock was released normally afterwards
        assert_eq!(1, cache.len());
    }

    #[test]
    fn test_weigher_reentry_is_a_failure() {
        let handle: Arc<OnceLock<SharedLru>> = Arc::default();

        let weigher_handle = handle.clone();
        let cache = CacheBuilder::new(4)
            .weigher(move |k: &usize, _v: &usize| {
                if *k == 2 {
                    if let Some(cache) = weigher_handle.get() {
                        return cache.len() as u64 + 1;
                    }
                }
                1
            })
            .build_shared()
            .unwrap();
        assert!(handle.set(cache.clone()).is_ok());

        cache.insert(1, 1).unwrap();
        assert!(matches!(
            cache.insert(2, 2),
            Err(CacheError::WeigherFailure(msg)) if msg.contains("re-entered")
        ));

        // nothing changed and the cache is still usable
        assert_eq!(vec![1], cache.keys());
        cache.insert(3, 3).unwrap();
        assert_eq!(vec![3, 1], cache.keys());
    }

    #[test]
    fn test_panicking_weigher_is_a_failure() {
        let cache = CacheBuilder::new(4)
            .weigher(|_k: &usize, v: &usize| -> u64 { panic!("cannot weigh {}", v) })
            .build_shared()
            .unwrap();

        assert_eq!(
            Err(CacheError::WeigherFailure("weigher panicked: cannot weigh 7".to_owned())),
            cache.insert(1, 7)
        );
        assert!(cache.is_empty());
    }
}
