//! Error types for patchbay-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid bus capacity: {0}. Must be at least 1")]
    InvalidCapacity(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
