//! Real-time control plane primitives shared by the patchbay subsystems.
//!
//! # Primary API
//!
//! - [`ParameterId`] / [`ParameterChange`] / [`ParameterSource`]: the bus payload
//! - [`ParameterBus`]: bidirectional lock-free exchange between UI and audio threads
//! - [`Clock`]: monotonic time source used for learning deadlines
//!
//! # Example
//!
//! ```
//! use patchbay_core::{ParameterBus, ParameterSource};
//!
//! let bus = ParameterBus::with_capacity(64).unwrap();
//! let (mut ui, mut audio) = bus.split();
//!
//! assert!(ui.push_to_audio("filter_cutoff", 0.5, ParameterSource::Ui));
//!
//! // Audio callback
//! let applied = audio.process_audio_updates(|change| {
//!     assert_eq!(change.id.as_str(), "filter_cutoff");
//! }, 32);
//! assert_eq!(applied, 1);
//! ```

pub mod error;
pub use error::{Error, Result};

mod parameter;
pub use parameter::{ParameterChange, ParameterId, ParameterSource, MAX_PARAMETER_ID_LEN};

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod bus;
pub use bus::{
    AudioEndpoint, BusConfig, BusMonitor, BusStatistics, ChangeConsumer, ChangeProducer,
    Direction, DirectionStatistics, ParameterBus, UiEndpoint, DEFAULT_BUS_CAPACITY,
};
