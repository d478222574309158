//! Database statistics and cache counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// Cache hit/miss counters.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

/// Rounded hit percentage, 0 before any access.
pub fn hit_rate_percent(hits: u64, misses: u64) -> u32 {
    let total = hits + misses;
    if total == 0 {
        return 0;
    }
    (hits as f64 / total as f64 * 100.0).round() as u32
}

/// Snapshot of database counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseStatistics {
    pub total_presets: usize,
    pub favorite_count: usize,
    pub category_count: usize,
    pub author_count: usize,
    pub tag_count: usize,
    pub directory_count: usize,
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// `hits / (hits + misses) * 100`, rounded
    pub cache_hit_rate: u32,
    pub scans_completed: u64,
    pub last_scan: Option<SystemTime>,
    pub last_scan_duration: Option<Duration>,
    pub is_updating: bool,
}
