//! Integration test modules for patchbay

pub mod bus;
pub mod learn;
pub mod presets;
