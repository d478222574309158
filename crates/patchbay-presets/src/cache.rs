//! Bounded metadata cache.

use crate::info::PresetInfo;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata cache keyed by file path.
///
/// When full, the first entry in path order is evicted.
#[derive(Debug)]
pub(crate) struct MetadataCache {
    entries: BTreeMap<PathBuf, PresetInfo>,
    capacity: usize,
}

impl MetadataCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    pub(crate) fn get(&self, path: &Path) -> Option<&PresetInfo> {
        self.entries.get(path)
    }

    pub(crate) fn insert(&mut self, info: PresetInfo) {
        if self.capacity == 0 {
            return;
        }
        self.entries.insert(info.file_path.clone(), info);
        while self.entries.len() > self.capacity {
            self.entries.pop_first();
        }
    }

    pub(crate) fn remove(&mut self, path: &Path) -> Option<PresetInfo> {
        self.entries.remove(path)
    }

    /// Drop every entry under `root`.
    pub(crate) fn remove_under(&mut self, root: &Path) {
        self.entries.retain(|path, _| !path.starts_with(root));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_eviction() {
        let mut cache = MetadataCache::new(2);
        cache.insert(PresetInfo::new("/a", "a"));
        cache.insert(PresetInfo::new("/b", "b"));
        cache.insert(PresetInfo::new("/c", "c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(Path::new("/a")).is_none());
        assert_eq!(cache.get(Path::new("/c")).unwrap().name, "c");
    }

    #[test]
    fn test_remove_under_root() {
        let mut cache = MetadataCache::new(10);
        cache.insert(PresetInfo::new("/lib/bass/a.json", "a"));
        cache.insert(PresetInfo::new("/lib/lead/b.json", "b"));
        cache.insert(PresetInfo::new("/library/c.json", "c"));

        cache.remove_under(Path::new("/lib"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(Path::new("/library/c.json")).is_some());
    }

    #[test]
    fn test_zero_capacity_caches_nothing() {
        let mut cache = MetadataCache::new(0);
        cache.insert(PresetInfo::new("/a", "a"));
        assert_eq!(cache.len(), 0);
    }
}
