//! Preset database configuration.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Extensions the scanner accepts, compared case-insensitively.
pub const DEFAULT_EXTENSIONS: [&str; 4] = ["json", "preset", "vital", "vitalbank"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Bound on the metadata cache (default: 1000)
    pub cache_size: usize,
    /// Scan watched roots recursively (default: true)
    pub recursive: bool,
    /// Accepted file extensions without the dot
    pub extensions: Vec<String>,
    /// How long hosts wait for a background scan by default (default: 10s)
    #[serde(deserialize_with = "duration_ms")]
    pub notification_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            cache_size: 1000,
            recursive: true,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            notification_timeout: Duration::from_secs(10),
        }
    }
}

fn duration_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.cache_size, 1000);
        assert!(config.recursive);
        assert_eq!(config.extensions, ["json", "preset", "vital", "vitalbank"]);
        assert_eq!(config.notification_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_override() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{ "recursive": false, "notification_timeout": 250 }"#)
                .unwrap();
        assert!(!config.recursive);
        assert_eq!(config.notification_timeout, Duration::from_millis(250));
        assert_eq!(config.cache_size, 1000);
    }
}
