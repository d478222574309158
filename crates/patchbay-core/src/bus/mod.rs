//! Parameter Update Bus.
//!
//! Two single-producer/single-consumer rings move [`ParameterChange`]s between
//! the UI thread and the audio callback without locks or allocation:
//!
//! - UI → Audio: [`UiEndpoint::push_to_audio`] / [`AudioEndpoint::process_audio_updates`]
//! - Audio → UI: [`AudioEndpoint::push_to_ui`] / [`UiEndpoint::process_ui_updates`]
//!
//! A full ring drops the new change and bumps the direction's drop counter.
//! Unread entries are never overwritten.

mod queue;
mod stats;

pub use queue::{ChangeConsumer, ChangeProducer};
pub use stats::{BusMonitor, BusStatistics, DirectionStatistics};

use crate::error::{Error, Result};
use crate::parameter::{ParameterChange, ParameterId, ParameterSource};
use ringbuf::{traits::Split, HeapRb};
use serde::Deserialize;
use stats::BusShared;
use std::sync::Arc;

pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Which way a ring carries changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ToAudio,
    ToUi,
}

/// Bus configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Slots per ring (default: 1024)
    pub capacity: usize,
    /// Log UI-side drops and drains (default: false)
    pub logging: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUS_CAPACITY,
            logging: false,
        }
    }
}

/// Both ends of a freshly created bus.
///
/// Hand the [`UiEndpoint`] to the UI/event thread and the [`AudioEndpoint`] to
/// the audio callback. [`BusMonitor`] handles can be cloned freely.
pub struct ParameterBus {
    ui: UiEndpoint,
    audio: AudioEndpoint,
    monitor: BusMonitor,
}

impl ParameterBus {
    pub fn new() -> Self {
        // DEFAULT_BUS_CAPACITY is non-zero.
        Self::build(BusConfig::default())
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(BusConfig {
            capacity,
            ..Default::default()
        })
    }

    pub fn with_config(config: BusConfig) -> Result<Self> {
        if config.capacity == 0 {
            return Err(Error::InvalidCapacity(config.capacity));
        }
        Ok(Self::build(config))
    }

    fn build(config: BusConfig) -> Self {
        let shared = Arc::new(BusShared::new(config.capacity, config.logging));

        let (to_audio_prod, to_audio_cons) = HeapRb::<ParameterChange>::new(config.capacity).split();
        let (to_ui_prod, to_ui_cons) = HeapRb::<ParameterChange>::new(config.capacity).split();

        let ui = UiEndpoint {
            to_audio: ChangeProducer::new(to_audio_prod, Direction::ToAudio, Arc::clone(&shared)),
            from_audio: ChangeConsumer::new(to_ui_cons, Direction::ToUi, Arc::clone(&shared)),
        };
        let audio = AudioEndpoint {
            to_ui: ChangeProducer::new(to_ui_prod, Direction::ToUi, Arc::clone(&shared)),
            from_ui: ChangeConsumer::new(to_audio_cons, Direction::ToAudio, Arc::clone(&shared)),
        };

        Self {
            ui,
            audio,
            monitor: BusMonitor::new(shared),
        }
    }

    pub fn monitor(&self) -> BusMonitor {
        self.monitor.clone()
    }

    pub fn split(self) -> (UiEndpoint, AudioEndpoint) {
        (self.ui, self.audio)
    }
}

impl Default for ParameterBus {
    fn default() -> Self {
        Self::new()
    }
}

/// UI-thread side: pushes toward audio, drains feedback from audio.
pub struct UiEndpoint {
    to_audio: ChangeProducer,
    from_audio: ChangeConsumer,
}

impl UiEndpoint {
    /// Returns `false` (and counts a drop) if the UI → Audio ring is full.
    #[inline]
    pub fn push_to_audio(
        &mut self,
        id: impl Into<ParameterId>,
        value: f32,
        source: ParameterSource,
    ) -> bool {
        self.to_audio.push(id, value, source)
    }

    /// Drains up to `max_batch` changes published by the audio thread.
    pub fn process_ui_updates<F>(&mut self, sink: F, max_batch: usize) -> usize
    where
        F: FnMut(&ParameterChange),
    {
        self.from_audio.drain(sink, max_batch)
    }

    pub fn statistics(&self) -> BusStatistics {
        self.to_audio.monitor().statistics()
    }

    pub fn monitor(&self) -> BusMonitor {
        self.to_audio.monitor()
    }

    pub fn into_parts(self) -> (ChangeProducer, ChangeConsumer) {
        (self.to_audio, self.from_audio)
    }
}

/// Audio-callback side: drains UI changes, publishes feedback toward the UI.
///
/// Nothing reachable from here locks, allocates or logs.
pub struct AudioEndpoint {
    to_ui: ChangeProducer,
    from_ui: ChangeConsumer,
}

impl AudioEndpoint {
    /// Returns `false` (and counts a drop) if the Audio → UI ring is full.
    #[inline]
    pub fn push_to_ui(
        &mut self,
        id: impl Into<ParameterId>,
        value: f32,
        source: ParameterSource,
    ) -> bool {
        self.to_ui.push(id, value, source)
    }

    /// Drains up to `max_batch` changes published by the UI thread.
    #[inline]
    pub fn process_audio_updates<F>(&mut self, sink: F, max_batch: usize) -> usize
    where
        F: FnMut(&ParameterChange),
    {
        self.from_ui.drain(sink, max_batch)
    }

    pub fn statistics(&self) -> BusStatistics {
        self.to_ui.monitor().statistics()
    }

    pub fn into_parts(self) -> (ChangeProducer, ChangeConsumer) {
        (self.to_ui, self.from_ui)
    }
}
