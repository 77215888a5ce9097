//! Counters describing cache usage.

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from a fresh resolved entry.
    pub hits: u64,
    /// Reads that had to fetch or join a fetch.
    pub misses: u64,
    /// Underlying fetches started (one per de-duplicated group).
    pub fetches: u64,
    /// Reads that joined a fetch already in flight.
    pub deduplicated: u64,
    /// Settlements dropped because a newer generation already applied.
    pub rejected_writes: u64,
    /// Direct and mutation writes that applied.
    pub writes: u64,
    pub invalidations: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
