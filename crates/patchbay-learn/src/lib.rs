//! MIDI CC learning engine.
//!
//! Routes incoming Control Change messages to named synthesis parameters
//! through a mapping table keyed by `(channel, cc)`, applying an output
//! range, a direction flag and a response curve. A learn session binds the
//! next moved controller to a parameter; auto-learn surveys which
//! controllers are in use.
//!
//! # Example
//!
//! ```
//! use patchbay_learn::{LearnConfig, LearnEngine, LearnState};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = LearnEngine::new(LearnConfig {
//!     save_on_drop: false,
//!     ..Default::default()
//! });
//!
//! engine.set_parameter_sink(Arc::new(|id: &str, value: f32| {
//!     println!("{id} -> {value}");
//! }));
//!
//! assert!(engine.start_learning("filter_cutoff", Duration::from_secs(3)));
//! engine.process_midi_cc(0, 74, 64, "Keystep");
//! assert_eq!(engine.state(), LearnState::Idle);
//! assert!(engine.is_parameter_mapped("filter_cutoff"));
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::LearnConfig;

pub mod mapping;
pub use mapping::{CCMapping, CCNumber, CcKey, CurveType, MidiChannel};

mod table;
pub use table::MappingTable;

mod session;
pub use session::{CcActivity, LearnRequest, LearnState};

mod stats;
pub use stats::LearnStatistics;

pub mod persist;
pub use persist::{MappingDocument, MAPPING_FILE_VERSION};

mod smoothing;
pub use smoothing::ValueSmoother;

mod engine;
pub use engine::{
    AutoLearnCallback, LearnEngine, MappingCallback, ParameterSink, StateCallback,
};

mod watchdog;
