//! Bus counters and statistics snapshots.

use super::Direction;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cache-line aligned counters for one direction.
#[derive(Debug, Default)]
#[repr(align(64))]
pub(super) struct DirectionCounters {
    pushed: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
    /// Advisory occupancy, raised before publish and lowered after consume.
    queued: AtomicUsize,
}

impl DirectionCounters {
    #[inline]
    pub(super) fn enter(&self) {
        self.queued.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub(super) fn record_push(&self) {
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn record_drop(&self) {
        self.queued.fetch_sub(1, Ordering::AcqRel);
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn record_consumed(&self, count: u64) {
        self.queued.fetch_sub(count as usize, Ordering::AcqRel);
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    fn snapshot(&self, capacity: usize) -> DirectionStatistics {
        DirectionStatistics {
            pushed: self.pushed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            size: self.queued.load(Ordering::Acquire).min(capacity),
        }
    }

    fn reset(&self) {
        self.pushed.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
    }
}

/// State shared by every half of one bus.
#[derive(Debug)]
pub(super) struct BusShared {
    to_audio: DirectionCounters,
    to_ui: DirectionCounters,
    logging: AtomicBool,
    capacity: usize,
    epoch: Instant,
}

impl BusShared {
    pub(super) fn new(capacity: usize, logging: bool) -> Self {
        Self {
            to_audio: DirectionCounters::default(),
            to_ui: DirectionCounters::default(),
            logging: AtomicBool::new(logging),
            capacity,
            epoch: Instant::now(),
        }
    }

    #[inline]
    pub(super) fn counters(&self, direction: Direction) -> &DirectionCounters {
        match direction {
            Direction::ToAudio => &self.to_audio,
            Direction::ToUi => &self.to_ui,
        }
    }

    #[inline]
    pub(super) fn logging_enabled(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    #[inline]
    pub(super) fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

/// Per-direction totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionStatistics {
    /// Successful pushes since the last reset.
    pub pushed: u64,
    /// Pushes rejected because the ring was full.
    pub dropped: u64,
    /// Changes consumed by the other side.
    pub processed: u64,
    /// Approximate number of unconsumed changes, never above capacity.
    pub size: usize,
}

/// Read-only bus snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStatistics {
    pub capacity: usize,
    pub to_audio: DirectionStatistics,
    pub to_ui: DirectionStatistics,
}

impl BusStatistics {
    /// Changes consumed in both directions.
    pub fn total_updates(&self) -> u64 {
        self.to_audio.processed + self.to_ui.processed
    }

    pub fn total_dropped(&self) -> u64 {
        self.to_audio.dropped + self.to_ui.dropped
    }
}

/// Cloneable read/control handle. Safe to use from any thread.
#[derive(Debug, Clone)]
pub struct BusMonitor {
    shared: Arc<BusShared>,
}

impl BusMonitor {
    pub(super) fn new(shared: Arc<BusShared>) -> Self {
        Self { shared }
    }

    pub fn statistics(&self) -> BusStatistics {
        BusStatistics {
            capacity: self.shared.capacity,
            to_audio: self.shared.to_audio.snapshot(self.shared.capacity),
            to_ui: self.shared.to_ui.snapshot(self.shared.capacity),
        }
    }

    /// Clears totals. Queue sizes are live values and are not affected.
    pub fn reset_statistics(&self) {
        self.shared.to_audio.reset();
        self.shared.to_ui.reset();
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.shared.logging.store(enabled, Ordering::Relaxed);
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.shared.logging_enabled()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}
