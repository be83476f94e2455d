//! Eviction listeners are told about every entry that leaves the cache, and
//! why.
//!
//! Listeners run synchronously, under the cache's lock, while the entry is
//! being removed. They must not call back into the cache; a
//! [`SharedCache`](crate::SharedCache) detects that and rejects it. A
//! listener that returns an error or panics is logged and otherwise ignored:
//! eviction always runs to completion.

use std::{
    fmt::Display,
    panic::{catch_unwind, AssertUnwindSafe},
};

use log::{error, warn};

use crate::error::{panic_message, BoxError};

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvictionReason {
    /// Evicted from the least recently used end to get back under capacity.
    Size,

    /// Removed by a call to `remove` or `remove_if_eq`.
    Explicit,

    /// The value was overwritten by `insert`, `replace`, or `replace_if_eq`.
    /// The listener sees the old value.
    Replaced,

    /// Removed by `clear`.
    Clear,
}

impl EvictionReason {
    /// True only for capacity-driven evictions.
    pub fn was_evicted(self) -> bool {
        self == EvictionReason::Size
    }
}

/// Receives (key, value, reason) for every entry leaving the cache.
pub trait EvictionListener<K, V>: Send + Sync {
    fn on_evict(&self, key: &K, value: &V, reason: EvictionReason) -> Result<(), BoxError>;
}

/// A listener backed by an infallible closure.
pub struct FnListener<F>(pub F);

impl<K, V, F> EvictionListener<K, V> for FnListener<F>
where
    F: Fn(&K, &V, EvictionReason) + Send + Sync,
{
    fn on_evict(&self, key: &K, value: &V, reason: EvictionReason) -> Result<(), BoxError> {
        (self.0)(key, value, reason);
        Ok(())
    }
}

/// A listener backed by a closure that may fail.
pub struct TryFnListener<F>(pub F);

impl<K, V, E, F> EvictionListener<K, V> for TryFnListener<F>
where
    F: Fn(&K, &V, EvictionReason) -> Result<(), E> + Send + Sync,
    E: Display,
{
    fn on_evict(&self, key: &K, value: &V, reason: EvictionReason) -> Result<(), BoxError> {
        (self.0)(key, value, reason).map_err(|e| e.to_string().into())
    }
}

/// Hands an outgoing entry to the listener, if there is one. Errors and
/// panics stop here.
pub(crate) fn notify<K, V>(
    listener: Option<&dyn EvictionListener<K, V>>,
    key: &K,
    value: &V,
    reason: EvictionReason,
) {
    let listener = match listener {
        Some(listener) => listener,
        None => return,
    };

    match catch_unwind(AssertUnwindSafe(|| listener.on_evict(key, value, reason))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("eviction listener failed ({:?}): {}", reason, e),
        Err(panic) => error!(
            "eviction listener panicked ({:?}): {}",
            reason,
            panic_message(&*panic)
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{notify, EvictionListener, EvictionReason, FnListener, TryFnListener};

    #[test]
    fn test_notify_without_listener() {
        notify::<u32, u32>(None, &1, &1, EvictionReason::Size);
    }

    #[test]
    fn test_notify_calls_listener() {
        let calls = AtomicUsize::new(0);
        let listener = FnListener(|k: &u32, v: &u32, reason: EvictionReason| {
            assert_eq!(1, *k);
            assert_eq!(2, *v);
            assert_eq!(EvictionReason::Explicit, reason);
            calls.fetch_add(1, Ordering::SeqCst);
        });

        notify(Some(&listener as &dyn EvictionListener<u32, u32>), &1, &2, EvictionReason::Explicit);
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_failures_are_contained() {
        let failing = TryFnListener(|_k: &u32, _v: &u32, _reason: EvictionReason| -> Result<(), &'static str> {
            Err("nope")
        });
        notify(Some(&failing as &dyn EvictionListener<u32, u32>), &1, &1, EvictionReason::Size);

        let panicking = FnListener(|_k: &u32, _v: &u32, _reason: EvictionReason| {
            panic!("listener blew up")
        });
        notify(Some(&panicking as &dyn EvictionListener<u32, u32>), &1, &1, EvictionReason::Size);
    }

    #[test]
    fn test_was_evicted() {
        assert!(EvictionReason::Size.was_evicted());
        assert!(!EvictionReason::Explicit.was_evicted());
        assert!(!EvictionReason::Replaced.was_evicted());
        assert!(!EvictionReason::Clear.was_evicted());
    }
}
