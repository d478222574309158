//! Patchbay host: owns the bus and wires the subsystems into it.

use crate::core::{
    AudioEndpoint, BusMonitor, BusStatistics, ChangeConsumer, ChangeProducer, ParameterChange,
    ParameterId, ParameterSource, UiEndpoint,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[cfg(feature = "learn")]
use crate::learn::LearnEngine;

#[cfg(feature = "presets")]
use crate::presets::{PresetDatabase, PresetInfo};

#[cfg(feature = "presets")]
use std::path::Path;

/// Control plane of one synth instance.
///
/// The UI side of the bus is split. The producer toward audio is shared by
/// the host and by the learn engine's parameter sink, so it sits behind its
/// own mutex; the feedback consumer has a separate one and host sinks run
/// after it is released. Only the audio endpoint must stay lock-free, and it
/// is handed out once via [`take_audio_endpoint`].
///
/// Subsystems follow the enabled Cargo features:
/// - MIDI learn (feature "learn") - CCs are routed to the bus as `Midi` changes
/// - Preset database (feature "presets") - presets are applied as `Preset` changes
///
/// [`take_audio_endpoint`]: Patchbay::take_audio_endpoint
pub struct Patchbay {
    to_audio: Arc<Mutex<ChangeProducer>>,
    from_audio: Mutex<ChangeConsumer>,
    audio: Mutex<Option<AudioEndpoint>>,
    monitor: BusMonitor,

    #[cfg(feature = "learn")]
    learn: Arc<LearnEngine>,

    #[cfg(feature = "presets")]
    presets: Arc<PresetDatabase>,
}

impl Patchbay {
    /// Create a new builder
    pub fn builder() -> crate::PatchbayBuilder {
        crate::PatchbayBuilder::default()
    }

    pub(crate) fn from_parts(
        ui: UiEndpoint,
        audio: AudioEndpoint,
        monitor: BusMonitor,
        #[cfg(feature = "learn")] learn: Arc<LearnEngine>,
        #[cfg(feature = "presets")] presets: Arc<PresetDatabase>,
    ) -> Self {
        let (to_audio, from_audio) = ui.into_parts();
        let to_audio = Arc::new(Mutex::new(to_audio));

        #[cfg(feature = "learn")]
        {
            let sink_producer = Arc::clone(&to_audio);
            learn.set_parameter_sink(Arc::new(move |id: &str, value: f32| {
                sink_producer.lock().push(id, value, ParameterSource::Midi);
            }));
        }

        Self {
            to_audio,
            from_audio: Mutex::new(from_audio),
            audio: Mutex::new(Some(audio)),
            monitor,
            #[cfg(feature = "learn")]
            learn,
            #[cfg(feature = "presets")]
            presets,
        }
    }

    // ------------------------------------------------------------------
    // Bus
    // ------------------------------------------------------------------

    /// The audio callback's end of the bus. Returns `None` after the first call.
    pub fn take_audio_endpoint(&self) -> Option<AudioEndpoint> {
        self.audio.lock().take()
    }

    /// Publish a change toward the audio thread. Returns false if the ring is full.
    pub fn push_parameter(
        &self,
        id: impl Into<ParameterId>,
        value: f32,
        source: ParameterSource,
    ) -> bool {
        self.to_audio.lock().push(id, value, source)
    }

    /// Drain up to `max_batch` changes published by the audio thread.
    ///
    /// `sink` runs with no bus lock held, so it may push parameters or feed
    /// MIDI into this same host.
    pub fn process_ui_updates<F>(&self, mut sink: F, max_batch: usize) -> usize
    where
        F: FnMut(&ParameterChange),
    {
        let mut batch = Vec::new();
        self.from_audio
            .lock()
            .drain(|change| batch.push(*change), max_batch);

        for change in &batch {
            sink(change);
        }
        batch.len()
    }

    pub fn monitor(&self) -> BusMonitor {
        self.monitor.clone()
    }

    pub fn bus_statistics(&self) -> BusStatistics {
        self.monitor.statistics()
    }

    // ------------------------------------------------------------------
    // MIDI learn
    // ------------------------------------------------------------------

    #[cfg(feature = "learn")]
    pub fn learn(&self) -> &Arc<LearnEngine> {
        &self.learn
    }

    /// Feed one CC message from a MIDI input.
    #[cfg(feature = "learn")]
    pub fn process_midi_cc(&self, channel: u8, cc_number: u8, value: u8, device: &str) {
        self.learn.process_midi_cc(channel, cc_number, value, device);
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    #[cfg(feature = "presets")]
    pub fn presets(&self) -> &Arc<PresetDatabase> {
        &self.presets
    }

    /// Push every parameter of the preset at `path` toward the audio thread.
    ///
    /// Returns the number of changes published; the rest were dropped.
    #[cfg(feature = "presets")]
    pub fn apply_preset(&self, path: impl AsRef<Path>) -> crate::Result<usize> {
        let path = path.as_ref();
        let info = self
            .presets
            .get_preset(path)
            .ok_or_else(|| crate::presets::Error::UnknownPreset(path.to_path_buf()))?;

        let published = self.apply_preset_info(&info);
        self.presets.record_play(path);
        Ok(published)
    }

    /// Push the parameters of an already loaded preset.
    #[cfg(feature = "presets")]
    pub fn apply_preset_info(&self, info: &PresetInfo) -> usize {
        let mut published = 0;
        {
            let mut producer = self.to_audio.lock();
            for (name, &value) in &info.parameters {
                if producer.push(name.as_str(), value, ParameterSource::Preset) {
                    published += 1;
                }
            }
        }

        if published < info.parameters.len() {
            tracing::warn!(
                "Preset {} applied partially: {} of {} parameters",
                info.name,
                published,
                info.parameters.len()
            );
        } else {
            tracing::debug!("Applied preset {} ({} parameters)", info.name, published);
        }
        published
    }

    /// Stop background threads. Also done on drop.
    pub fn shutdown(&self) {
        #[cfg(feature = "learn")]
        self.learn.stop_watchdog();

        #[cfg(feature = "presets")]
        self.presets.shutdown();
    }
}

impl Drop for Patchbay {
    fn drop(&mut self) {
        self.shutdown();
        #[cfg(feature = "learn")]
        self.learn.clear_callbacks();
    }
}
