//! MIDI CC mapping types and value conversion.
//!
//! For the thread-safe engine that owns mappings, see [`LearnEngine`](crate::LearnEngine).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// MIDI CC number (0-127)
pub type CCNumber = u8;

/// MIDI channel (0-15, where 0 = channel 1)
pub type MidiChannel = u8;

/// Table key: a controller on a channel, or on any channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CcKey {
    /// `None` = any channel
    pub channel: Option<MidiChannel>,
    pub cc_number: CCNumber,
}

impl CcKey {
    pub fn new(channel: Option<MidiChannel>, cc_number: CCNumber) -> Self {
        Self { channel, cc_number }
    }

    pub fn exact(channel: MidiChannel, cc_number: CCNumber) -> Self {
        Self::new(Some(channel), cc_number)
    }

    pub fn any_channel(cc_number: CCNumber) -> Self {
        Self::new(None, cc_number)
    }
}

/// Response curve applied to the normalized controller value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CurveType {
    /// `n`
    #[default]
    Linear,
    /// `n²`, more resolution at the low end
    Exponential,
    /// `√n`, more resolution at the high end
    Logarithmic,
    /// Smoothstep `n²(3 − 2n)`
    SShape,
}

impl CurveType {
    #[inline]
    pub fn apply(self, n: f32) -> f32 {
        match self {
            CurveType::Linear => n,
            CurveType::Exponential => n * n,
            CurveType::Logarithmic => n.sqrt(),
            CurveType::SShape => n * n * (3.0 - 2.0 * n),
        }
    }

    /// Guess a curve from a parameter name.
    ///
    /// Filter and resonance names are checked first, so `filter_cutoff`
    /// resolves to [`CurveType::SShape`].
    pub fn detect(parameter_id: &str) -> Self {
        let name = parameter_id.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

        if has(&["resonance", "filter"]) {
            CurveType::SShape
        } else if has(&["frequency", "cutoff", "pitch"]) {
            CurveType::Exponential
        } else if has(&["volume", "gain", "level"]) {
            CurveType::Logarithmic
        } else {
            CurveType::Linear
        }
    }
}

/// A MIDI CC mapping entry.
///
/// Serialized field names follow the mapping file format (`ccNumber`,
/// `parameterId`, ...). A channel of `-1` in the file means any channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CCMapping {
    /// MIDI channel (None = all channels)
    #[serde(with = "channel_repr")]
    pub channel: Option<MidiChannel>,
    pub cc_number: CCNumber,
    pub parameter_id: String,
    /// Value produced for CC 0 (before inversion)
    pub min_value: f32,
    /// Value produced for CC 127 (before inversion)
    pub max_value: f32,
    pub inverted: bool,
    /// One-pole smoothing factor in [0, 1), applied by the consumer
    #[serde(default)]
    pub smoothing: f32,
    #[serde(default)]
    pub curve_type: CurveType,
    #[serde(with = "epoch_millis")]
    pub learn_time: SystemTime,
    #[serde(default)]
    pub device_name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CCMapping {
    /// Mapping over `[0, 1]`, linear, active.
    pub fn new(
        channel: Option<MidiChannel>,
        cc_number: CCNumber,
        parameter_id: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            cc_number,
            parameter_id: parameter_id.into(),
            min_value: 0.0,
            max_value: 1.0,
            inverted: false,
            smoothing: 0.0,
            curve_type: CurveType::Linear,
            learn_time: SystemTime::now(),
            device_name: String::new(),
            is_active: true,
        }
    }

    pub fn with_range(mut self, min_value: f32, max_value: f32) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_curve(mut self, curve_type: CurveType) -> Self {
        self.curve_type = curve_type;
        self
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_device(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    #[inline]
    pub fn key(&self) -> CcKey {
        CcKey::new(self.channel, self.cc_number)
    }

    /// Map a CC value (0-127) to the parameter range.
    ///
    /// Normalize, optionally invert, apply the curve, then scale into
    /// `[min_value, max_value]`. Memoryless; see [`ValueSmoother`](crate::ValueSmoother).
    #[inline]
    pub fn map_value(&self, cc_value: u8) -> f32 {
        let mut normalized = cc_value.min(127) as f32 / 127.0;
        if self.inverted {
            normalized = 1.0 - normalized;
        }
        let curved = self.curve_type.apply(normalized);
        self.min_value + curved * (self.max_value - self.min_value)
    }

    /// Check if this mapping matches the given channel and CC number
    #[inline]
    pub fn matches(&self, channel: MidiChannel, cc_number: CCNumber) -> bool {
        if !self.is_active {
            return false;
        }
        let channel_matches = self.channel.is_none() || self.channel == Some(channel);
        channel_matches && self.cc_number == cc_number
    }

    /// Structural checks applied before a mapping enters the table.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(channel) = self.channel {
            if channel > 15 {
                return Err(format!("channel {} out of range 0-15", channel));
            }
        }
        if self.cc_number > 127 {
            return Err(format!("CC {} out of range 0-127", self.cc_number));
        }
        if self.parameter_id.is_empty() {
            return Err("empty parameter id".to_string());
        }
        if !(self.min_value <= self.max_value) {
            return Err(format!(
                "min {} greater than max {} for {}",
                self.min_value, self.max_value, self.parameter_id
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!("smoothing {} outside [0, 1)", self.smoothing));
        }
        Ok(())
    }
}

mod channel_repr {
    use super::MidiChannel;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        channel: &Option<MidiChannel>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(channel.map(|c| c as i8).unwrap_or(-1))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<MidiChannel>, D::Error> {
        match i8::deserialize(deserializer)? {
            -1 => Ok(None),
            c @ 0..=15 => Ok(Some(c as MidiChannel)),
            other => Err(D::Error::custom(format!("invalid channel {}", other))),
        }
    }
}

mod epoch_millis {
    use super::*;

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}
