//! Learning engine configuration.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Default file the mapping table is persisted to, relative to the working directory.
pub const DEFAULT_MAPPING_FILE: &str = "midi_cc_mappings.json";

/// Configuration for learn sessions, auto-learn and persistence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearnConfig {
    /// Learn session timeout when none is given (default: 5s)
    #[serde(deserialize_with = "duration_ms")]
    pub learn_timeout: Duration,
    /// Minimum CC movement that completes a learn session (default: 5)
    pub sensitivity: u8,
    /// Pick the response curve from the parameter name (default: true)
    pub auto_curve_detection: bool,
    /// Auto-learn survey length (default: 10s)
    #[serde(deserialize_with = "duration_ms")]
    pub auto_learn_duration: Duration,
    /// Value changes needed for a controller to count as active (default: 3)
    pub active_change_threshold: u32,
    /// Persistence target (default: `midi_cc_mappings.json`)
    pub mapping_file: Option<PathBuf>,
    /// Save changed mappings when the engine is dropped (default: true)
    pub save_on_drop: bool,
    /// Deadline polling period of the watchdog thread (default: 10ms)
    #[serde(deserialize_with = "duration_ms")]
    pub watchdog_interval: Duration,
}

impl Default for LearnConfig {
    fn default() -> Self {
        Self {
            learn_timeout: Duration::from_secs(5),
            sensitivity: 5,
            auto_curve_detection: true,
            auto_learn_duration: Duration::from_secs(10),
            active_change_threshold: 3,
            mapping_file: Some(PathBuf::from(DEFAULT_MAPPING_FILE)),
            save_on_drop: true,
            watchdog_interval: Duration::from_millis(10),
        }
    }
}

/// Durations are written as integer milliseconds.
fn duration_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
