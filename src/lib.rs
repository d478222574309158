//! # Patchbay - Real-time Synth Control Plane
//!
//! Moves parameter changes between a UI and an audio callback, learns MIDI
//! controller assignments, and indexes preset libraries.
//!
//! ## Architecture
//!
//! Patchbay is an umbrella crate that coordinates:
//! - **patchbay-core** - Parameter identity and the lock-free parameter update bus
//! - **patchbay-learn** - MIDI CC learning engine (mappings, curves, persistence)
//! - **patchbay-presets** - Preset database (scanning, indices, filter and sort)
//!
//! ## Quick Start
//!
//! ```
//! use patchbay::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let patchbay = Patchbay::builder()
//!     .learn_config(LearnConfig { save_on_drop: false, ..Default::default() })
//!     .load_mappings(false)
//!     .build()?;
//! let mut audio = patchbay.take_audio_endpoint().unwrap();
//!
//! patchbay.learn().start_learning("filter_cutoff", Duration::from_secs(3));
//! patchbay.process_midi_cc(0, 74, 64, "Keystep");
//! patchbay.process_midi_cc(0, 74, 127, "Keystep");
//!
//! // Audio callback
//! audio.process_audio_updates(|change| {
//!     assert_eq!(change.id, "filter_cutoff");
//!     assert_eq!(change.source, ParameterSource::Midi);
//! }, 64);
//! # Ok::<(), patchbay::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Everything enabled (`full`)
//! - `learn` - MIDI CC learning engine
//! - `presets` - Preset database

/// Re-export of patchbay-core for direct access
pub use patchbay_core as core;

pub use patchbay_core::{
    AudioEndpoint, BusConfig, BusMonitor, BusStatistics, Clock, ManualClock, ParameterBus,
    ParameterChange, ParameterId, ParameterSource, SystemClock, UiEndpoint, DEFAULT_BUS_CAPACITY,
};

// MIDI learn
#[cfg(feature = "learn")]
pub use patchbay_learn as learn;

#[cfg(feature = "learn")]
pub use patchbay_learn::{
    CCMapping, CcActivity, CurveType, LearnConfig, LearnEngine, LearnRequest, LearnState,
    LearnStatistics, ValueSmoother,
};

// Preset database
#[cfg(feature = "presets")]
pub use patchbay_presets as presets;

#[cfg(feature = "presets")]
pub use patchbay_presets::{
    AudioCharacteristics, DatabaseConfig, DatabaseStatistics, FilterCriteria, JsonMetadataLoader,
    MetadataLoader, PresetDatabase, PresetInfo, SortCriteria, SortDirection,
};

mod error;
pub use error::{Error, Result};

mod config;
pub use config::PatchbayConfig;

mod builder;
mod system;

pub use builder::PatchbayBuilder;
pub use system::Patchbay;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Patchbay, PatchbayBuilder, PatchbayConfig};

    // Bus
    pub use crate::core::{AudioEndpoint, ParameterChange, ParameterSource};

    // MIDI learn
    #[cfg(feature = "learn")]
    pub use crate::learn::{CCMapping, CurveType, LearnConfig, LearnEngine, LearnState};

    // Presets
    #[cfg(feature = "presets")]
    pub use crate::presets::{FilterCriteria, PresetDatabase, PresetInfo, SortCriteria};
}
