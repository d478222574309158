//! Preset metadata records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::SystemTime;

/// Highest accepted user rating.
pub const MAX_RATING: u8 = 5;

/// Coarse sound descriptors used for filtering.
///
/// Content values are in `[0, 1]`; `0.5` means "no evidence either way".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioCharacteristics {
    pub bass_content: f32,
    pub mid_content: f32,
    pub treble_content: f32,
    pub brightness: f32,
    pub warmth: f32,
    pub complexity: f32,
    pub has_arpeggiator: bool,
    pub has_sequencer: bool,
    pub modulation_count: u32,
}

impl Default for AudioCharacteristics {
    fn default() -> Self {
        Self {
            bass_content: 0.5,
            mid_content: 0.5,
            treble_content: 0.5,
            brightness: 0.5,
            warmth: 0.5,
            complexity: 0.0,
            has_arpeggiator: false,
            has_sequencer: false,
            modulation_count: 0,
        }
    }
}

/// Running mean of parameter values whose name carries a hint.
#[derive(Default)]
struct Evidence {
    sum: f32,
    count: u32,
}

impl Evidence {
    fn add(&mut self, value: f32) {
        self.sum += value;
        self.count += 1;
    }

    fn mean_or(&self, fallback: f32) -> f32 {
        if self.count == 0 {
            fallback
        } else {
            (self.sum / self.count as f32).clamp(0.0, 1.0)
        }
    }
}

impl AudioCharacteristics {
    /// Estimate characteristics from parameter names and normalized values.
    pub fn from_parameters(parameters: &BTreeMap<String, f32>) -> Self {
        let mut bass = Evidence::default();
        let mut mid = Evidence::default();
        let mut treble = Evidence::default();
        let mut brightness = Evidence::default();
        let mut warmth = Evidence::default();
        let mut out = Self::default();

        for (name, &value) in parameters {
            let name = name.to_lowercase();
            let v = value.clamp(0.0, 1.0);

            if name.contains("bass") || name.contains("sub") || name.contains("low") {
                bass.add(v);
            }
            if name.contains("mid") {
                mid.add(v);
            }
            if name.contains("treble") || name.contains("high") || name.contains("air") {
                treble.add(v);
            }
            if name.contains("cutoff") || name.contains("bright") {
                brightness.add(v);
            }
            if name.contains("warm") || name.contains("drive") || name.contains("saturat") {
                warmth.add(v);
            }
            if name.contains("arp") && v > 0.5 {
                out.has_arpeggiator = true;
            }
            if name.contains("seq") && v > 0.5 {
                out.has_sequencer = true;
            }
            if (name.contains("lfo") || name.contains("mod") || name.contains("env"))
                && name.contains("amount")
                && v > 0.0
            {
                out.modulation_count += 1;
            }
        }

        out.bass_content = bass.mean_or(0.5);
        out.mid_content = mid.mean_or(0.5);
        out.treble_content = treble.mean_or(0.5);
        out.brightness = brightness.mean_or(0.5);
        out.warmth = warmth.mean_or(0.5);
        out.complexity = ((parameters.len() as f32 / 128.0).min(1.0) * 0.5
            + (out.modulation_count as f32 / 16.0).min(1.0) * 0.5)
            .clamp(0.0, 1.0);
        out
    }
}

/// One preset file and everything known about it.
///
/// Equality and hashing use `file_path`; ordering is by `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PresetInfo {
    pub file_path: PathBuf,
    pub name: String,
    pub category: String,
    pub author: String,
    pub description: String,
    pub tags: Vec<String>,
    pub license: String,
    pub created: SystemTime,
    pub modified: SystemTime,
    pub last_accessed: SystemTime,
    pub file_size: u64,
    pub is_favorite: bool,
    /// 0 to [`MAX_RATING`]
    pub user_rating: u8,
    pub play_count: u32,
    pub audio: AudioCharacteristics,
    /// Numeric parameters by name, as stored in the file.
    pub parameters: BTreeMap<String, f32>,
    pub is_metadata_cached: bool,
    pub needs_parameter_analysis: bool,
}

impl Default for PresetInfo {
    fn default() -> Self {
        Self {
            file_path: PathBuf::new(),
            name: String::new(),
            category: String::new(),
            author: String::new(),
            description: String::new(),
            tags: Vec::new(),
            license: String::new(),
            created: SystemTime::UNIX_EPOCH,
            modified: SystemTime::UNIX_EPOCH,
            last_accessed: SystemTime::UNIX_EPOCH,
            file_size: 0,
            is_favorite: false,
            user_rating: 0,
            play_count: 0,
            audio: AudioCharacteristics::default(),
            parameters: BTreeMap::new(),
            is_metadata_cached: false,
            needs_parameter_analysis: true,
        }
    }
}

impl PresetInfo {
    pub fn new(file_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f32) -> Self {
        self.parameters.insert(name.into(), value);
        self.needs_parameter_analysis = false;
        self
    }

    /// Clamps to [`MAX_RATING`].
    pub fn set_rating(&mut self, rating: u8) {
        self.user_rating = rating.min(MAX_RATING);
    }

    /// Case-insensitive match against name, author, description and tags.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_text(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.author.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

impl PartialEq for PresetInfo {
    fn eq(&self, other: &Self) -> bool {
        self.file_path == other.file_path
    }
}

impl Eq for PresetInfo {}

impl Hash for PresetInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file_path.hash(state);
    }
}

impl PartialOrd for PresetInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PresetInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        // Path breaks ties so the order agrees with equality.
        self.name
            .cmp(&other.name)
            .then_with(|| self.file_path.cmp(&other.file_path))
    }
}
