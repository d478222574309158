//! Builder for configuring and constructing a `Patchbay`.

use crate::core::ParameterBus;
use crate::{PatchbayConfig, Patchbay, Result};

#[cfg(any(feature = "learn", feature = "presets"))]
use std::sync::Arc;

#[cfg(feature = "learn")]
use crate::learn::{LearnConfig, LearnEngine};

#[cfg(feature = "presets")]
use crate::presets::{DatabaseConfig, MetadataLoader, PresetDatabase};

#[cfg(feature = "presets")]
use std::path::PathBuf;

/// Subsystems (learn, presets) are created when their Cargo features are
/// compiled. Preset scanning starts only when at least one directory is given.
///
/// # Example
///
/// ```no_run
/// use patchbay::prelude::*;
///
/// let patchbay = Patchbay::builder()
///     .bus_capacity(2048)
///     .preset_directory("/usr/share/presets")
///     .build()?;
///
/// let audio = patchbay.take_audio_endpoint();
/// # Ok::<(), patchbay::Error>(())
/// ```
pub struct PatchbayBuilder {
    config: PatchbayConfig,

    #[cfg(feature = "learn")]
    watchdog: bool,

    #[cfg(feature = "learn")]
    load_mappings: bool,

    #[cfg(feature = "presets")]
    loader: Option<Arc<dyn MetadataLoader>>,
}

impl Default for PatchbayBuilder {
    fn default() -> Self {
        Self {
            config: PatchbayConfig::default(),

            #[cfg(feature = "learn")]
            watchdog: true,

            #[cfg(feature = "learn")]
            load_mappings: true,

            #[cfg(feature = "presets")]
            loader: None,
        }
    }
}

impl PatchbayBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: PatchbayConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 1024
    pub fn bus_capacity(mut self, capacity: usize) -> Self {
        self.config.bus.capacity = capacity;
        self
    }

    /// Default: false
    pub fn bus_logging(mut self, enabled: bool) -> Self {
        self.config.bus.logging = enabled;
        self
    }

    #[cfg(feature = "learn")]
    pub fn learn_config(mut self, config: LearnConfig) -> Self {
        self.config.learn = config;
        self
    }

    /// Run the learn timeout watchdog thread. Default: true
    #[cfg(feature = "learn")]
    pub fn watchdog(mut self, enabled: bool) -> Self {
        self.watchdog = enabled;
        self
    }

    /// Load the configured mapping file if it exists. Default: true
    #[cfg(feature = "learn")]
    pub fn load_mappings(mut self, enabled: bool) -> Self {
        self.load_mappings = enabled;
        self
    }

    #[cfg(feature = "presets")]
    pub fn database_config(mut self, config: DatabaseConfig) -> Self {
        self.config.database = config;
        self
    }

    #[cfg(feature = "presets")]
    pub fn preset_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.preset_directories.push(dir.into());
        self
    }

    /// Decode preset files with a custom loader instead of JSON.
    #[cfg(feature = "presets")]
    pub fn preset_loader(mut self, loader: Arc<dyn MetadataLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Result<Patchbay> {
        let bus = ParameterBus::with_config(self.config.bus)?;
        let monitor = bus.monitor();
        let (ui, audio) = bus.split();

        #[cfg(feature = "learn")]
        let learn = {
            let engine = LearnEngine::new(self.config.learn.clone());
            let mapping_file = self.config.learn.mapping_file.as_deref();
            if self.load_mappings && mapping_file.is_some_and(|p| p.is_file()) {
                // A bad mapping file should not prevent startup.
                if let Err(e) = engine.load_default_mappings() {
                    tracing::warn!("Ignoring mapping file: {}", e);
                }
            }
            if self.watchdog {
                engine.start_watchdog()?;
            }
            Arc::new(engine)
        };

        #[cfg(feature = "presets")]
        let presets = {
            let database = match self.loader {
                Some(loader) => PresetDatabase::with_loader(self.config.database.clone(), loader),
                None => PresetDatabase::new(self.config.database.clone()),
            };
            if !self.config.preset_directories.is_empty() {
                database.try_initialize(&self.config.preset_directories)?;
            }
            Arc::new(database)
        };

        tracing::debug!("Patchbay built (bus capacity {})", monitor.capacity());

        Ok(Patchbay::from_parts(
            ui,
            audio,
            monitor,
            #[cfg(feature = "learn")]
            learn,
            #[cfg(feature = "presets")]
            presets,
        ))
    }
}
