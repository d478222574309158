//! Error types for the preset database.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preset parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("No valid preset directories")]
    NoValidDirectories,

    #[error("Unknown preset: {}", .0.display())]
    UnknownPreset(PathBuf),

    #[error("Not a preset file: {}", .0.display())]
    NotAPreset(PathBuf),

    #[error("Scanner thread error: {0}")]
    Thread(String),
}

pub type Result<T> = std::result::Result<T, Error>;
