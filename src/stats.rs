/// Running counters for a cache. Lookups that don't promote (`peek`,
/// `contains_key`, snapshots) are not counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// `get` calls that found their key.
    pub hits: u64,

    /// `get` calls that didn't.
    pub misses: u64,

    /// Successful inserts, including ones that replaced a value.
    pub inserts: u64,

    /// Entries evicted to get back under capacity.
    pub evictions: u64,

    /// Entries removed by `remove` or `remove_if_eq`.
    pub removals: u64,
}

impl CacheStats {
    /// Fraction of `get` calls that hit, or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CacheStats;

    #[test]
    fn test_hit_rate() {
        assert_eq!(0.0, CacheStats::default().hit_rate());

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
