//! Top-level configuration.

use crate::Result;
use patchbay_core::BusConfig;
use serde::Deserialize;
use std::path::Path;

#[cfg(feature = "presets")]
use std::path::PathBuf;

/// Settings for every enabled subsystem.
///
/// Missing sections fall back to their defaults:
///
/// ```
/// let config = patchbay::PatchbayConfig::from_json(r#"{ "bus": { "capacity": 256 } }"#).unwrap();
/// assert_eq!(config.bus.capacity, 256);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatchbayConfig {
    pub bus: BusConfig,

    #[cfg(feature = "learn")]
    pub learn: patchbay_learn::LearnConfig,

    #[cfg(feature = "presets")]
    pub database: patchbay_presets::DatabaseConfig,

    /// Roots scanned when the system is built
    #[cfg(feature = "presets")]
    pub preset_directories: Vec<PathBuf>,
}

impl PatchbayConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = PatchbayConfig::from_json("{}").unwrap();
        assert_eq!(config.bus.capacity, patchbay_core::DEFAULT_BUS_CAPACITY);
        assert!(!config.bus.logging);
    }

    #[cfg(all(feature = "learn", feature = "presets"))]
    #[test]
    fn test_nested_sections() {
        let config = PatchbayConfig::from_json(
            r#"{
                "learn": { "sensitivity": 2, "mapping_file": "maps.json" },
                "database": { "cache_size": 10 },
                "preset_directories": ["/a", "/b"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.learn.sensitivity, 2);
        assert_eq!(config.database.cache_size, 10);
        assert_eq!(config.preset_directories.len(), 2);
    }

    #[test]
    fn test_bad_document() {
        assert!(matches!(
            PatchbayConfig::from_json("{ nope"),
            Err(crate::Error::Config(_))
        ));
    }
}
