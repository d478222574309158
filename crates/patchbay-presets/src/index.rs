//! Secondary indices over the preset table.

use crate::info::PresetInfo;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

type MultiMap = BTreeMap<String, BTreeSet<PathBuf>>;

/// Name, category, author, tag and favorite indices.
///
/// Fully derived from the primary table; [`PresetIndex::build`] is the
/// repair path whenever incremental maintenance is in doubt.
#[derive(Debug, Clone, Default)]
pub(crate) struct PresetIndex {
    names: MultiMap,
    categories: MultiMap,
    authors: MultiMap,
    tags: MultiMap,
    favorites: BTreeSet<PathBuf>,
}

fn link(map: &mut MultiMap, key: &str, path: &Path) {
    if key.is_empty() {
        return;
    }
    map.entry(key.to_string())
        .or_default()
        .insert(path.to_path_buf());
}

fn unlink(map: &mut MultiMap, key: &str, path: &Path) {
    if let Some(paths) = map.get_mut(key) {
        paths.remove(path);
        if paths.is_empty() {
            map.remove(key);
        }
    }
}

impl PresetIndex {
    pub(crate) fn build<'a>(presets: impl IntoIterator<Item = &'a PresetInfo>) -> Self {
        let mut index = Self::default();
        for info in presets {
            index.insert(info);
        }
        index
    }

    pub(crate) fn insert(&mut self, info: &PresetInfo) {
        let path = info.file_path.as_path();
        link(&mut self.names, &info.name.to_lowercase(), path);
        link(&mut self.categories, &info.category, path);
        link(&mut self.authors, &info.author, path);
        for tag in &info.tags {
            link(&mut self.tags, tag, path);
        }
        if info.is_favorite {
            self.favorites.insert(path.to_path_buf());
        }
    }

    pub(crate) fn remove(&mut self, info: &PresetInfo) {
        let path = info.file_path.as_path();
        unlink(&mut self.names, &info.name.to_lowercase(), path);
        unlink(&mut self.categories, &info.category, path);
        unlink(&mut self.authors, &info.author, path);
        for tag in &info.tags {
            unlink(&mut self.tags, tag, path);
        }
        self.favorites.remove(path);
    }

    /// Exact and substring matches on the lowercased name, deduplicated.
    pub(crate) fn search_name(&self, query: &str) -> BTreeSet<PathBuf> {
        let needle = query.to_lowercase();
        let mut found: BTreeSet<PathBuf> =
            self.names.get(&needle).cloned().unwrap_or_default();
        for (name, paths) in &self.names {
            if name.contains(&needle) {
                found.extend(paths.iter().cloned());
            }
        }
        found
    }

    pub(crate) fn by_category(&self, category: &str) -> impl Iterator<Item = &PathBuf> {
        self.categories.get(category).into_iter().flatten()
    }

    pub(crate) fn by_author(&self, author: &str) -> impl Iterator<Item = &PathBuf> {
        self.authors.get(author).into_iter().flatten()
    }

    pub(crate) fn by_tag(&self, tag: &str) -> impl Iterator<Item = &PathBuf> {
        self.tags.get(tag).into_iter().flatten()
    }

    pub(crate) fn favorites(&self) -> impl Iterator<Item = &PathBuf> {
        self.favorites.iter()
    }

    pub(crate) fn categories(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    pub(crate) fn authors(&self) -> Vec<String> {
        self.authors.keys().cloned().collect()
    }

    pub(crate) fn tags(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub(crate) fn favorite_count(&self) -> usize {
        self.favorites.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<PresetInfo> {
        vec![
            PresetInfo::new("/b/1.json", "Deep Bass")
                .with_category("Bass")
                .with_author("John Doe")
                .with_tags(["dark"]),
            PresetInfo::new("/b/2.json", "Bass")
                .with_category("Bass")
                .with_author("Ann"),
            PresetInfo::new("/l/1.json", "Screamer")
                .with_category("Lead")
                .with_author("John Doe")
                .with_tags(["dark", "loud"]),
        ]
    }

    #[test]
    fn test_build_and_lookup() {
        let presets = sample();
        let index = PresetIndex::build(&presets);
        assert_eq!(index.by_category("Bass").count(), 2);
        assert_eq!(index.by_author("John Doe").count(), 2);
        assert_eq!(index.by_tag("dark").count(), 2);
        assert_eq!(index.categories(), ["Bass", "Lead"]);
        assert_eq!(index.tags(), ["dark", "loud"]);
    }

    #[test]
    fn test_search_name_union() {
        let presets = sample();
        let index = PresetIndex::build(&presets);
        let found = index.search_name("BASS");
        assert_eq!(found.len(), 2);
        assert!(index.search_name("nothing").is_empty());
    }

    #[test]
    fn test_remove_cleans_empty_keys() {
        let presets = sample();
        let mut index = PresetIndex::build(&presets);
        index.remove(&presets[2]);
        assert_eq!(index.categories(), ["Bass"]);
        assert_eq!(index.tags(), ["dark"]);
        assert_eq!(index.by_author("John Doe").count(), 1);
    }

    #[test]
    fn test_favorites() {
        let mut fav = PresetInfo::new("/f.json", "Fav");
        fav.is_favorite = true;
        let index = PresetIndex::build([&fav]);
        assert_eq!(index.favorite_count(), 1);
        assert_eq!(index.favorites().next(), Some(&PathBuf::from("/f.json")));
    }
}
