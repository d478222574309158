//! Parameter identity and the change record carried by the bus.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest identifier, in bytes, a [`ParameterId`] stores inline.
pub const MAX_PARAMETER_ID_LEN: usize = 47;

/// Short, stable parameter name stored inline.
///
/// Fixed capacity so a change record can be copied through the bus without
/// touching the allocator. Longer names are truncated on a char boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterId {
    len: u8,
    bytes: [u8; MAX_PARAMETER_ID_LEN],
}

impl ParameterId {
    pub fn new(id: &str) -> Self {
        let mut end = id.len().min(MAX_PARAMETER_ID_LEN);
        while !id.is_char_boundary(end) {
            end -= 1;
        }

        let mut bytes = [0u8; MAX_PARAMETER_ID_LEN];
        bytes[..end].copy_from_slice(&id.as_bytes()[..end]);
        Self {
            len: end as u8,
            bytes,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // Always valid: `new` only copies whole chars.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for ParameterId {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for ParameterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&String> for ParameterId {
    fn from(id: &String) -> Self {
        Self::new(id)
    }
}

impl PartialEq<str> for ParameterId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ParameterId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParameterId({:?})", self.as_str())
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a change. Used for UI feedback and to break update loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParameterSource {
    #[default]
    Ui,
    Midi,
    Iot,
    Automation,
    Preset,
    Internal,
}

/// A single parameter update. Created by a producer, consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterChange {
    pub id: ParameterId,
    pub value: f32,
    pub source: ParameterSource,
    /// Microseconds since the owning bus was created, stamped at enqueue.
    pub timestamp_us: u64,
}

impl ParameterChange {
    pub fn new(
        id: impl Into<ParameterId>,
        value: f32,
        source: ParameterSource,
        timestamp_us: u64,
    ) -> Self {
        Self {
            id: id.into(),
            value,
            source,
            timestamp_us,
        }
    }
}
