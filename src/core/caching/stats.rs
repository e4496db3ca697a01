//! Caching layer counters

/// Counters kept by [`CachingFeatureStore`](super::CachingFeatureStore)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Queries routed to the backing store (spatial filter plus a finite
    /// resolution bound), including rejected ones
    pub client_queries: u64,
    /// Queries served from the snapshot
    pub cache_queries: u64,
    /// Client queries refused for exceeding the row ceiling
    pub rejected_client_queries: u64,
    pub snapshots_installed: u64,
    /// Finished snapshots thrown away because a mutation went through
    /// while they were being built
    pub snapshots_discarded: u64,
    /// Mutations that reached the backing store but could not be replayed
    /// against the snapshot
    pub mirror_failures: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_client_query(&mut self) {
        self.client_queries += 1;
    }

    pub fn record_cache_query(&mut self) {
        self.cache_queries += 1;
    }

    pub fn record_rejected_client_query(&mut self) {
        self.rejected_client_queries += 1;
    }

    pub fn record_snapshot_installed(&mut self) {
        self.snapshots_installed += 1;
    }

    pub fn record_snapshot_discarded(&mut self) {
        self.snapshots_discarded += 1;
    }

    pub fn record_mirror_failure(&mut self) {
        self.mirror_failures += 1;
    }

    /// Fraction of queries served without touching the backing store
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.client_queries + self.cache_queries;
        if total == 0 {
            0.0
        } else {
            self.cache_queries as f64 / total as f64
        }
    }
}
