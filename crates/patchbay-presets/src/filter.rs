//! Filter predicates and sort orders for preset lists.

use crate::info::PresetInfo;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::SystemTime;

/// Inclusive bounds on audio characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioRange {
    pub min_bass: f32,
    pub max_bass: f32,
    pub min_brightness: f32,
    pub max_brightness: f32,
}

impl Default for AudioRange {
    fn default() -> Self {
        Self {
            min_bass: 0.0,
            max_bass: 1.0,
            min_brightness: 0.0,
            max_brightness: 1.0,
        }
    }
}

/// Conjunction of optional predicates. Empty fields are inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Case-insensitive substring of name, author, description or any tag
    pub search_text: String,
    pub categories: Vec<String>,
    pub authors: Vec<String>,
    /// Preset must carry at least one of these
    pub tags: Vec<String>,
    pub favorites_only: bool,
    pub min_rating: u8,
    /// Inclusive range on `created`
    pub date_range: Option<(SystemTime, SystemTime)>,
    pub audio: Option<AudioRange>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn favorites_only(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn min_rating(mut self, rating: u8) -> Self {
        self.min_rating = rating;
        self
    }

    pub fn created_between(mut self, from: SystemTime, to: SystemTime) -> Self {
        self.date_range = Some((from, to));
        self
    }

    pub fn audio(mut self, range: AudioRange) -> Self {
        self.audio = Some(range);
        self
    }

    /// True if every active predicate holds for `info`.
    pub fn matches(&self, info: &PresetInfo) -> bool {
        if !self.search_text.is_empty() && !info.matches_text(&self.search_text.to_lowercase()) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&info.category) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.contains(&info.author) {
            return false;
        }
        if !self.tags.is_empty() && !info.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if self.favorites_only && !info.is_favorite {
            return false;
        }
        if info.user_rating < self.min_rating {
            return false;
        }
        if let Some((from, to)) = self.date_range {
            if info.created < from || info.created > to {
                return false;
            }
        }
        if let Some(range) = self.audio {
            let bass = info.audio.bass_content;
            let brightness = info.audio.brightness;
            if bass < range.min_bass
                || bass > range.max_bass
                || brightness < range.min_brightness
                || brightness > range.max_brightness
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortCriteria {
    #[default]
    Name,
    Author,
    Category,
    DateCreated,
    DateModified,
    /// Favorites first when ascending
    Favorites,
    Rating,
    PlayCount,
    FileSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

fn caseless(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

impl SortCriteria {
    /// Ascending comparison on this key alone.
    pub fn compare(self, a: &PresetInfo, b: &PresetInfo) -> Ordering {
        match self {
            SortCriteria::Name => caseless(&a.name, &b.name),
            SortCriteria::Author => caseless(&a.author, &b.author),
            SortCriteria::Category => caseless(&a.category, &b.category),
            SortCriteria::DateCreated => a.created.cmp(&b.created),
            SortCriteria::DateModified => a.modified.cmp(&b.modified),
            SortCriteria::Favorites => b.is_favorite.cmp(&a.is_favorite),
            SortCriteria::Rating => a.user_rating.cmp(&b.user_rating),
            SortCriteria::PlayCount => a.play_count.cmp(&b.play_count),
            SortCriteria::FileSize => a.file_size.cmp(&b.file_size),
        }
    }
}

/// Stable in-place sort; equal keys keep their relative order in both directions.
pub fn sort_presets(presets: &mut [PresetInfo], criteria: SortCriteria, direction: SortDirection) {
    match direction {
        SortDirection::Ascending => presets.sort_by(|a, b| criteria.compare(a, b)),
        SortDirection::Descending => presets.sort_by(|a, b| criteria.compare(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn preset(path: &str, name: &str) -> PresetInfo {
        PresetInfo::new(path, name)
    }

    #[test]
    fn test_empty_criteria_matches_all() {
        assert!(FilterCriteria::new().matches(&preset("/a", "A")));
    }

    #[test]
    fn test_combined_predicates() {
        let mut info = preset("/a", "Growl")
            .with_category("Bass")
            .with_author("John Doe")
            .with_tags(["dark"]);
        info.user_rating = 3;

        let criteria = FilterCriteria::new().category("Bass").author("John Doe");
        assert!(criteria.matches(&info));
        assert!(!criteria.clone().min_rating(4).matches(&info));
        assert!(!criteria.clone().favorites_only().matches(&info));
        assert!(criteria.clone().tag("dark").tag("x").matches(&info));
        assert!(!criteria.tag("bright").matches(&info));
    }

    #[test]
    fn test_search_text_is_case_insensitive() {
        let info = preset("/a", "Growl").with_tags(["Analog"]);
        assert!(FilterCriteria::new().search("ANALOG").matches(&info));
        assert!(FilterCriteria::new().search("grow").matches(&info));
        assert!(!FilterCriteria::new().search("pad").matches(&info));
    }

    #[test]
    fn test_date_and_audio_ranges() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut info = preset("/a", "A");
        info.created = base;
        info.audio.bass_content = 0.8;
        info.audio.brightness = 0.2;

        let hour = Duration::from_secs(3600);
        assert!(FilterCriteria::new()
            .created_between(base, base + hour)
            .matches(&info));
        assert!(!FilterCriteria::new()
            .created_between(base + hour, base + hour * 2)
            .matches(&info));

        let bassy = AudioRange {
            min_bass: 0.7,
            ..Default::default()
        };
        assert!(FilterCriteria::new().audio(bassy).matches(&info));
        let bright = AudioRange {
            min_brightness: 0.5,
            ..Default::default()
        };
        assert!(!FilterCriteria::new().audio(bright).matches(&info));
    }

    #[test]
    fn test_sort_favorites_first() {
        let mut list = vec![preset("/1", "a"), preset("/2", "b"), preset("/3", "c")];
        list[1].is_favorite = true;

        sort_presets(&mut list, SortCriteria::Favorites, SortDirection::Ascending);
        assert_eq!(list[0].name, "b");
        assert_eq!(list[1].name, "a");

        sort_presets(&mut list, SortCriteria::Favorites, SortDirection::Descending);
        assert_eq!(list[2].name, "b");
    }

    #[test]
    fn test_sort_descending_is_stable() {
        let mut list = vec![preset("/1", "x"), preset("/2", "y"), preset("/3", "z")];
        list[0].user_rating = 2;
        list[1].user_rating = 5;
        list[2].user_rating = 2;

        sort_presets(&mut list, SortCriteria::Rating, SortDirection::Descending);
        let names: Vec<_> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["y", "x", "z"]);
    }

    #[test]
    fn test_sort_name_ignores_case() {
        let mut list = vec![preset("/1", "beta"), preset("/2", "Alpha")];
        sort_presets(&mut list, SortCriteria::Name, SortDirection::Ascending);
        assert_eq!(list[0].name, "Alpha");
    }
}
