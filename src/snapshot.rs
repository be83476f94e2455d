//! Point-in-time copies of a cache's contents.
//!
//! A [`Snapshot`] is what callers iterate instead of the cache itself: the
//! key, value, and entry views are all built from it and none of them are
//! live. With the `serde` feature a snapshot is also the explicit export and
//! import format for a cache (see [`Cache::restore`](crate::Cache::restore)).

use std::{borrow::Borrow, iter::FromIterator, slice, vec};

/// Entries of a cache ordered from most recently used to least recently used.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Snapshot<K, V> {
    /// Number of entries captured.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the cache was empty when the snapshot was taken.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, most recently used first.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Keys, most recently used first.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Values, most recently used first.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Looks a key up by scanning the snapshot.
    pub fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries
            .iter()
            .find(|(key, _)| key.borrow() == k)
            .map(|(_, v)| v)
    }

    /// The entries themselves, most recently used first.
    pub fn into_entries(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K, V> From<Vec<(K, V)>> for Snapshot<K, V> {
    fn from(entries: Vec<(K, V)>) -> Self {
        Self { entries }
    }
}

impl<K, V> FromIterator<(K, V)> for Snapshot<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, V> IntoIterator for Snapshot<K, V> {
    type Item = (K, V);
    type IntoIter = vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a Snapshot<K, V> {
    type Item = &'a (K, V);
    type IntoIter = slice::Iter<'a, (K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::Snapshot;

    fn sample() -> Snapshot<String, u32> {
        vec![("c".to_owned(), 3), ("b".to_owned(), 2), ("a".to_owned(), 1)].into()
    }

    #[test]
    fn test_views() {
        let snapshot = sample();

        assert_eq!(3, snapshot.len());
        assert_eq!(vec!["c", "b", "a"], snapshot.keys().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(vec![3, 2, 1], snapshot.values().copied().collect::<Vec<_>>());
        assert_eq!(Some(&2), snapshot.get("b"));
        assert_eq!(None, snapshot.get("z"));
    }

    #[test]
    fn test_collect() {
        let snapshot: Snapshot<u32, u32> = (0..3).map(|i| (i, i * 10)).collect();
        assert_eq!(vec![(0, 0), (1, 10), (2, 20)], snapshot.into_entries());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_export_import() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: Snapshot<String, u32> = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, restored);
    }
}
