//! Preset database.
//!
//! Indexes preset files found under watched directories and serves lookup,
//! filtering, sorting and statistics while a background thread keeps the
//! table current.
//!
//! # Example
//!
//! ```no_run
//! use patchbay_presets::{FilterCriteria, PresetDatabase, SortCriteria, SortDirection};
//! use std::time::Duration;
//!
//! let db = PresetDatabase::default();
//! db.initialize(&["/usr/share/presets"]);
//! db.wait_for_update(Duration::from_secs(10));
//!
//! let mut basses = db.filter(&FilterCriteria::new().category("Bass").author("John Doe"));
//! PresetDatabase::sort(&mut basses, SortCriteria::Rating, SortDirection::Descending);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{DatabaseConfig, DEFAULT_EXTENSIONS};

mod info;
pub use info::{AudioCharacteristics, PresetInfo, MAX_RATING};

mod loader;
pub use loader::{is_preset_file, JsonMetadataLoader, MetadataLoader};

mod filter;
pub use filter::{sort_presets, AudioRange, FilterCriteria, SortCriteria, SortDirection};

mod cache;
mod index;
mod scanner;

mod stats;
pub use stats::{hit_rate_percent, DatabaseStatistics};

mod database;
pub use database::{PresetDatabase, UpdateCallback};
