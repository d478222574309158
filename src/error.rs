//! Centralized error type for the patchbay umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] patchbay_core::Error),

    #[cfg(feature = "learn")]
    #[error("Learn: {0}")]
    Learn(#[from] patchbay_learn::Error),

    #[cfg(feature = "presets")]
    #[error("Presets: {0}")]
    Presets(#[from] patchbay_presets::Error),

    #[error("Config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
