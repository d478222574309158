//! Ring halves for one bus direction.
//!
//! `ringbuf` publishes the write index with a release store after the slot is
//! written and reads it with acquire before touching the slot; the read index
//! is handled the same way in reverse. Both indices are cache-padded.

use super::stats::{BusMonitor, BusShared};
use super::Direction;
use crate::parameter::{ParameterChange, ParameterId, ParameterSource};
use ringbuf::{traits::*, HeapCons, HeapProd};
use std::sync::Arc;

/// Producer half of one direction. Exactly one thread may own it.
pub struct ChangeProducer {
    producer: HeapProd<ParameterChange>,
    direction: Direction,
    shared: Arc<BusShared>,
}

impl ChangeProducer {
    pub(super) fn new(
        producer: HeapProd<ParameterChange>,
        direction: Direction,
        shared: Arc<BusShared>,
    ) -> Self {
        Self {
            producer,
            direction,
            shared,
        }
    }

    /// Publishes a change. Returns `false` if the ring is full; the change is dropped.
    #[inline]
    pub fn push(&mut self, id: impl Into<ParameterId>, value: f32, source: ParameterSource) -> bool {
        let change = ParameterChange {
            id: id.into(),
            value,
            source,
            timestamp_us: self.shared.now_us(),
        };
        self.push_change(change)
    }

    /// Publishes a pre-built change, keeping its timestamp.
    #[inline]
    pub fn push_change(&mut self, change: ParameterChange) -> bool {
        let counters = self.shared.counters(self.direction);

        // Count as queued before publishing so the advisory size never
        // undercounts what a consumer can observe.
        counters.enter();
        match self.producer.try_push(change) {
            Ok(()) => {
                counters.record_push();
                true
            }
            Err(rejected) => {
                counters.record_drop();
                if self.direction == Direction::ToAudio && self.shared.logging_enabled() {
                    tracing::warn!(
                        "Parameter bus full, dropped {} = {} ({:?})",
                        rejected.id,
                        rejected.value,
                        rejected.source
                    );
                }
                false
            }
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn monitor(&self) -> BusMonitor {
        BusMonitor::new(Arc::clone(&self.shared))
    }
}

/// Consumer half of one direction. Exactly one thread may own it.
pub struct ChangeConsumer {
    consumer: HeapCons<ParameterChange>,
    direction: Direction,
    shared: Arc<BusShared>,
}

impl ChangeConsumer {
    pub(super) fn new(
        consumer: HeapCons<ParameterChange>,
        direction: Direction,
        shared: Arc<BusShared>,
    ) -> Self {
        Self {
            consumer,
            direction,
            shared,
        }
    }

    #[inline]
    pub fn pop(&mut self) -> Option<ParameterChange> {
        let change = self.consumer.try_pop()?;
        self.shared.counters(self.direction).record_consumed(1);
        Some(change)
    }

    /// Invokes `sink` for up to `max_batch` changes in FIFO order.
    #[inline]
    pub fn drain<F>(&mut self, mut sink: F, max_batch: usize) -> usize
    where
        F: FnMut(&ParameterChange),
    {
        let mut count = 0;
        while count < max_batch {
            match self.consumer.try_pop() {
                Some(change) => {
                    sink(&change);
                    count += 1;
                }
                None => break,
            }
        }

        if count > 0 {
            self.shared
                .counters(self.direction)
                .record_consumed(count as u64);
            if self.direction == Direction::ToUi && self.shared.logging_enabled() {
                tracing::debug!("Processed {} parameter updates from audio", count);
            }
        }
        count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}
