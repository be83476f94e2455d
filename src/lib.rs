//! A weight-bounded LRU cache, plus a wrapper for sharing one between
//! threads.
//!
//! [`LruCache`] keeps the total weight of its entries at or under a fixed
//! capacity by evicting least recently used entries. Every entry weighs 1
//! unless a [`Weigher`] says otherwise, so by default the capacity is simply
//! an entry count. An [`EvictionListener`] can be told about everything that
//! leaves the cache.
//!
//! ```
//! use weighted_lru::{Cache, LruCache};
//!
//! let mut cache: LruCache<usize, String> = LruCache::with_capacity(2).unwrap();
//!
//! cache.insert(0, "Put".to_owned()).unwrap();
//! cache.insert(1, "things".to_owned()).unwrap();
//! cache.get(&0);
//! cache.insert(2, "in memory".to_owned()).unwrap();
//!
//! // 1 was the least recently used
//! assert_eq!(None, cache.get(&1));
//! ```
//!
//! [`SharedCache`] puts any [`Cache`] behind a single lock so clones of it
//! can be handed to other threads.
//!
//! ```
//! use std::thread;
//! use weighted_lru::{CacheBuilder, EvictionReason};
//!
//! let cache = CacheBuilder::new(100)
//!     .on_evict(|k: &u32, _v: &u32, reason: EvictionReason| {
//!         println!("{} left the cache: {:?}", k, reason);
//!     })
//!     .build_shared()
//!     .unwrap();
//!
//! let thread_cache = cache.clone();
//! thread::spawn(move || thread_cache.insert(1, 1)).join().unwrap().unwrap();
//!
//! assert_eq!(Some(1), cache.get(&1));
//! ```

mod builder;
mod cache;
mod error;
mod linked_list;
mod listener;
mod lru_cache;
#[cfg(feature = "shared_cache")]
mod shared_cache;
mod snapshot;
mod stats;
mod weigher;

pub use builder::{CacheBuilder, DEFAULT_CAPACITY};
pub use cache::Cache;
pub use error::{BoxError, CacheError, Result};
pub use listener::{EvictionListener, EvictionReason, FnListener, TryFnListener};
pub use lru_cache::LruCache;
#[cfg(feature = "shared_cache")]
pub use shared_cache::SharedCache;
pub use snapshot::Snapshot;
pub use stats::CacheStats;
pub use weigher::{FnWeigher, TryFnWeigher, UnitWeigher, Weigher};
