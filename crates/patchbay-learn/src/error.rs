//! Error types for the learning engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mapping file parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported mapping file version: {0}")]
    UnsupportedVersion(u32),

    #[error("Parameter already mapped: {0}")]
    AlreadyMapped(String),

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("Learning engine is disabled")]
    Disabled,

    #[error("No mapping file configured")]
    NoMappingFile,

    #[error("Thread error: {0}")]
    Thread(String),
}

pub type Result<T> = std::result::Result<T, Error>;
