//! Preset database: primary table, indices, cache and scanner control.
//!
//! Lock order is index, then data, then cache. Queries take only what they
//! need; the update callback runs with no lock held.

use crate::cache::MetadataCache;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::filter::{sort_presets, FilterCriteria, SortCriteria, SortDirection};
use crate::index::PresetIndex;
use crate::info::PresetInfo;
use crate::loader::{is_preset_file, JsonMetadataLoader, MetadataLoader};
use crate::scanner::{collect_preset_files, Scanner};
use crate::stats::{hit_rate_percent, CacheCounters, DatabaseStatistics};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Receives the full preset list after every notable change.
pub type UpdateCallback = dyn Fn(&[PresetInfo]) + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
struct WatchedDir {
    path: PathBuf,
    recursive: bool,
}

#[derive(Default)]
struct DataState {
    presets: HashMap<PathBuf, PresetInfo>,
    directories: Vec<WatchedDir>,
    scans_completed: u64,
    last_scan: Option<SystemTime>,
    last_scan_duration: Option<Duration>,
}

impl DataState {
    fn watch(&mut self, path: &Path, recursive: bool) {
        match self.directories.iter_mut().find(|d| d.path == path) {
            Some(existing) => existing.recursive = recursive,
            None => self.directories.push(WatchedDir {
                path: path.to_path_buf(),
                recursive,
            }),
        }
    }

    fn is_watched(&self, path: &Path) -> bool {
        self.directories.iter().any(|d| path.starts_with(&d.path))
    }
}

fn resolve<'a>(data: &DataState, paths: impl Iterator<Item = &'a PathBuf>) -> Vec<PresetInfo> {
    paths
        .filter_map(|path| data.presets.get(path).cloned())
        .collect()
}

/// State shared between the database handle and its scanner thread.
pub(crate) struct Shared {
    config: DatabaseConfig,
    loader: Arc<dyn MetadataLoader>,
    index: RwLock<PresetIndex>,
    data: RwLock<DataState>,
    cache: Mutex<MetadataCache>,
    counters: CacheCounters,
    /// Scans requested and not yet finished.
    pending_updates: Mutex<usize>,
    update_done: Condvar,
    stop: AtomicBool,
    callback: RwLock<Option<Arc<UpdateCallback>>>,
}

impl Shared {
    /// Full scan of every watched root, then one index rebuild.
    pub(crate) fn scan_all(&self) {
        let roots = self.data.read().directories.clone();
        let started = Instant::now();
        tracing::info!("Scanning {} preset root(s)", roots.len());

        let mut seen = HashSet::new();
        for root in &roots {
            if !root.path.is_dir() {
                tracing::warn!("Preset directory unavailable: {}", root.path.display());
                continue;
            }
            seen.extend(self.scan_root(&root.path, root.recursive, &self.stop));
        }

        if self.stop.load(Ordering::Acquire) {
            tracing::debug!("Preset scan interrupted");
        } else {
            self.prune(&roots, &seen);
        }
        self.rebuild_indices();

        let elapsed = started.elapsed();
        let total = {
            let mut data = self.data.write();
            data.scans_completed += 1;
            data.last_scan = Some(SystemTime::now());
            data.last_scan_duration = Some(elapsed);
            data.presets.len()
        };
        tracing::info!("Preset scan finished: {} presets in {:?}", total, elapsed);
        self.notify();
    }

    /// Load every preset file under `root`; returns the paths that were stored.
    ///
    /// `stop` ends the walk early. The scanner passes its shutdown flag;
    /// synchronous callers pass their own.
    fn scan_root(&self, root: &Path, recursive: bool, stop: &AtomicBool) -> Vec<PathBuf> {
        let files = collect_preset_files(root, recursive, &self.config.extensions, stop);
        let mut loaded = Vec::with_capacity(files.len());

        for path in files {
            if stop.load(Ordering::Acquire) {
                break;
            }
            match self.loader.load(&path) {
                Ok(info) => {
                    if self.store(info) {
                        loaded.push(path);
                    }
                }
                Err(e) => tracing::warn!("Skipping preset {}: {}", path.display(), e),
            }
        }
        loaded
    }

    /// Insert a freshly loaded record, keeping user attributes from a
    /// previous scan.
    ///
    /// Records outside every watched root are discarded, so a directory
    /// removed while it was being scanned stays empty.
    fn store(&self, mut info: PresetInfo) -> bool {
        {
            let mut data = self.data.write();
            if !data.is_watched(&info.file_path) {
                tracing::debug!("Discarding {}: root no longer watched", info.file_path.display());
                return false;
            }
            if let Some(existing) = data.presets.get(&info.file_path) {
                info.is_favorite = existing.is_favorite;
                info.user_rating = existing.user_rating;
                info.play_count = existing.play_count;
            }
            data.presets.insert(info.file_path.clone(), info.clone());
        }
        self.cache.lock().insert(info);
        true
    }

    /// Drop entries under scanned roots whose files were not found.
    fn prune(&self, roots: &[WatchedDir], seen: &HashSet<PathBuf>) {
        let mut data = self.data.write();
        let stale: Vec<PathBuf> = data
            .presets
            .keys()
            .filter(|path| !seen.contains(*path))
            .filter(|path| roots.iter().any(|root| path.starts_with(&root.path)))
            .cloned()
            .collect();
        if stale.is_empty() {
            return;
        }

        let mut cache = self.cache.lock();
        for path in &stale {
            data.presets.remove(path);
            cache.remove(path);
        }
        tracing::debug!("Removed {} stale presets", stale.len());
    }

    pub(crate) fn rebuild_indices(&self) {
        let mut index = self.index.write();
        let data = self.data.read();
        *index = PresetIndex::build(data.presets.values());
    }

    fn snapshot(&self) -> Vec<PresetInfo> {
        let mut presets: Vec<PresetInfo> = self.data.read().presets.values().cloned().collect();
        presets.sort();
        presets
    }

    fn notify(&self) {
        let callback = self.callback.read().clone();
        if let Some(callback) = callback {
            let snapshot = self.snapshot();
            callback(&snapshot);
        }
    }

    fn begin_update(&self) {
        *self.pending_updates.lock() += 1;
    }

    pub(crate) fn finish_update(&self) {
        let mut pending = self.pending_updates.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.update_done.notify_all();
        }
    }
}

/// Indexed collection of preset files under watched directories.
///
/// Background scans keep the table current while every query stays
/// available; a query during a scan sees a partial but consistent table.
pub struct PresetDatabase {
    shared: Arc<Shared>,
    scanner: Mutex<Option<Scanner>>,
}

impl PresetDatabase {
    pub fn new(config: DatabaseConfig) -> Self {
        Self::with_loader(config, Arc::new(JsonMetadataLoader::new()))
    }

    /// Use a custom metadata loader for format-specific decoding.
    pub fn with_loader(config: DatabaseConfig, loader: Arc<dyn MetadataLoader>) -> Self {
        let cache = MetadataCache::new(config.cache_size);
        Self {
            shared: Arc::new(Shared {
                config,
                loader,
                index: RwLock::new(PresetIndex::default()),
                data: RwLock::new(DataState::default()),
                cache: Mutex::new(cache),
                counters: CacheCounters::default(),
                pending_updates: Mutex::new(0),
                update_done: Condvar::new(),
                stop: AtomicBool::new(false),
                callback: RwLock::new(None),
            }),
            scanner: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.shared.config
    }

    // ------------------------------------------------------------------
    // Directories and scanning
    // ------------------------------------------------------------------

    /// Watch `directories` and start a background scan.
    ///
    /// Invalid roots are logged and skipped. Returns false only if none is valid.
    pub fn initialize<P: AsRef<Path>>(&self, directories: &[P]) -> bool {
        match self.try_initialize(directories) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Preset database initialization failed: {}", e);
                false
            }
        }
    }

    /// Returns the number of valid roots.
    pub fn try_initialize<P: AsRef<Path>>(&self, directories: &[P]) -> Result<usize> {
        let mut accepted = 0;
        {
            let mut data = self.shared.data.write();
            for dir in directories {
                let dir = dir.as_ref();
                if !dir.is_dir() {
                    tracing::warn!("Skipping invalid preset directory {}", dir.display());
                    continue;
                }
                data.watch(dir, self.shared.config.recursive);
                accepted += 1;
            }
        }

        if accepted == 0 {
            return Err(Error::NoValidDirectories);
        }
        self.request_scan()?;
        Ok(accepted)
    }

    /// Queue a background rescan of every watched root.
    pub fn rescan(&self) -> bool {
        match self.request_scan() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not start preset scan: {}", e);
                false
            }
        }
    }

    fn request_scan(&self) -> Result<()> {
        let mut scanner = self.scanner.lock();
        if scanner.is_none() {
            self.shared.stop.store(false, Ordering::Release);
            *scanner = Some(Scanner::spawn(Arc::clone(&self.shared))?);
        }

        self.shared.begin_update();
        let sent = scanner.as_ref().is_some_and(Scanner::request_scan);
        if !sent {
            self.shared.finish_update();
            return Err(Error::Thread("scanner is not running".to_string()));
        }
        Ok(())
    }

    /// Watch one more root and scan it synchronously.
    pub fn add_directory(&self, dir: impl AsRef<Path>, recursive: bool) -> bool {
        let dir = dir.as_ref();
        match self.try_add_directory(dir, recursive) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Cannot add preset directory {}: {}", dir.display(), e);
                false
            }
        }
    }

    /// Returns the number of presets loaded from `dir`.
    pub fn try_add_directory(&self, dir: impl AsRef<Path>, recursive: bool) -> Result<usize> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::InvalidDirectory(dir.to_path_buf()));
        }

        self.shared.data.write().watch(dir, recursive);
        // Independent of the scanner's flag so this still works after shutdown.
        let never = AtomicBool::new(false);
        let loaded = self.shared.scan_root(dir, recursive, &never).len();
        self.shared.rebuild_indices();
        tracing::info!("Added preset directory {} ({} presets)", dir.display(), loaded);
        self.shared.notify();
        Ok(loaded)
    }

    /// Stop watching `dir` and drop every preset beneath it.
    pub fn remove_directory(&self, dir: impl AsRef<Path>) -> bool {
        let dir = dir.as_ref();
        let changed = {
            let mut index = self.shared.index.write();
            let mut data = self.shared.data.write();

            let before = data.directories.len();
            data.directories.retain(|d| d.path != dir);
            let was_watched = data.directories.len() != before;

            let stale: Vec<PathBuf> = data
                .presets
                .keys()
                .filter(|path| path.starts_with(dir))
                .cloned()
                .collect();
            for path in &stale {
                if let Some(info) = data.presets.remove(path) {
                    index.remove(&info);
                }
            }
            self.shared.cache.lock().remove_under(dir);
            was_watched || !stale.is_empty()
        };

        if changed {
            self.shared.notify();
        }
        changed
    }

    pub fn directories(&self) -> Vec<PathBuf> {
        self.shared
            .data
            .read()
            .directories
            .iter()
            .map(|d| d.path.clone())
            .collect()
    }

    pub fn is_updating(&self) -> bool {
        *self.shared.pending_updates.lock() > 0
    }

    /// Block until no scan is pending. Returns false on timeout.
    pub fn wait_for_update(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.shared.pending_updates.lock();
        while *pending > 0 {
            if self
                .shared
                .update_done
                .wait_until(&mut pending, deadline)
                .timed_out()
            {
                return *pending == 0;
            }
        }
        true
    }

    /// [`wait_for_update`](Self::wait_for_update) with the configured notification timeout.
    pub fn wait_for_scan(&self) -> bool {
        self.wait_for_update(self.shared.config.notification_timeout)
    }

    pub fn set_update_callback(&self, callback: Arc<UpdateCallback>) {
        *self.shared.callback.write() = Some(callback);
    }

    pub fn clear_update_callback(&self) {
        *self.shared.callback.write() = None;
    }

    /// Stop the scanner after its current file and join it.
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::Release);
        let scanner = self.scanner.lock().take();
        if let Some(mut scanner) = scanner {
            scanner.stop();
            tracing::debug!("Preset scanner stopped");
        }

        let mut pending = self.shared.pending_updates.lock();
        *pending = 0;
        self.shared.update_done.notify_all();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Every preset, ordered by name.
    pub fn get_all_presets(&self) -> Vec<PresetInfo> {
        self.shared.snapshot()
    }

    pub fn len(&self) -> usize {
        self.shared.data.read().presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive exact or substring match on the name.
    pub fn search_by_name(&self, query: &str) -> Vec<PresetInfo> {
        let index = self.shared.index.read();
        let data = self.shared.data.read();
        resolve(&data, index.search_name(query).iter())
    }

    pub fn get_by_category(&self, category: &str) -> Vec<PresetInfo> {
        let index = self.shared.index.read();
        let data = self.shared.data.read();
        resolve(&data, index.by_category(category))
    }

    pub fn get_by_author(&self, author: &str) -> Vec<PresetInfo> {
        let index = self.shared.index.read();
        let data = self.shared.data.read();
        resolve(&data, index.by_author(author))
    }

    pub fn get_by_tag(&self, tag: &str) -> Vec<PresetInfo> {
        let index = self.shared.index.read();
        let data = self.shared.data.read();
        resolve(&data, index.by_tag(tag))
    }

    pub fn get_favorites(&self) -> Vec<PresetInfo> {
        let index = self.shared.index.read();
        let data = self.shared.data.read();
        resolve(&data, index.favorites())
    }

    /// Linear scan applying every active predicate.
    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<PresetInfo> {
        self.shared
            .data
            .read()
            .presets
            .values()
            .filter(|info| criteria.matches(info))
            .cloned()
            .collect()
    }

    /// Stable in-place sort.
    pub fn sort(presets: &mut [PresetInfo], criteria: SortCriteria, direction: SortDirection) {
        sort_presets(presets, criteria, direction);
    }

    /// Cache first, then the table, then an on-demand load of a preset file.
    pub fn get_preset(&self, path: impl AsRef<Path>) -> Option<PresetInfo> {
        let path = path.as_ref();

        let cached = self.shared.cache.lock().get(path).cloned();
        if let Some(mut info) = cached {
            self.shared.counters.hit();
            info.is_metadata_cached = true;
            return Some(info);
        }
        self.shared.counters.miss();

        let stored = self.shared.data.read().presets.get(path).cloned();
        let mut info = match stored {
            Some(info) => info,
            None if is_preset_file(path, &self.shared.config.extensions) => {
                match self.shared.loader.load(path) {
                    Ok(info) => info,
                    Err(e) => {
                        tracing::debug!("On-demand load of {} failed: {}", path.display(), e);
                        return None;
                    }
                }
            }
            None => return None,
        };

        self.shared.cache.lock().insert(info.clone());
        info.is_metadata_cached = true;
        Some(info)
    }

    pub fn get_all_categories(&self) -> Vec<String> {
        self.shared.index.read().categories()
    }

    pub fn get_all_authors(&self) -> Vec<String> {
        self.shared.index.read().authors()
    }

    pub fn get_all_tags(&self) -> Vec<String> {
        self.shared.index.read().tags()
    }

    pub fn get_statistics(&self) -> DatabaseStatistics {
        let (cache_hits, cache_misses) = self.shared.counters.snapshot();
        let mut stats = {
            let index = self.shared.index.read();
            let data = self.shared.data.read();
            let cache = self.shared.cache.lock();
            DatabaseStatistics {
                total_presets: data.presets.len(),
                favorite_count: index.favorite_count(),
                category_count: index.categories().len(),
                author_count: index.authors().len(),
                tag_count: index.tags().len(),
                directory_count: data.directories.len(),
                cache_size: cache.len(),
                cache_hits,
                cache_misses,
                cache_hit_rate: hit_rate_percent(cache_hits, cache_misses),
                scans_completed: data.scans_completed,
                last_scan: data.last_scan,
                last_scan_duration: data.last_scan_duration,
                is_updating: false,
            }
        };
        stats.is_updating = self.is_updating();
        stats
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert or replace a record. Returns false for an empty path.
    pub fn add_preset(&self, info: PresetInfo) -> bool {
        if info.file_path.as_os_str().is_empty() {
            return false;
        }
        {
            let mut index = self.shared.index.write();
            let mut data = self.shared.data.write();
            if let Some(old) = data.presets.get(&info.file_path) {
                index.remove(old);
            }
            index.insert(&info);
            self.shared.cache.lock().remove(&info.file_path);
            data.presets.insert(info.file_path.clone(), info);
        }
        self.shared.notify();
        true
    }

    /// Replace an existing record. Unknown paths are left untouched.
    pub fn update_preset(&self, path: impl AsRef<Path>, info: PresetInfo) -> bool {
        let path = path.as_ref();
        let mut info = info;
        info.file_path = path.to_path_buf();
        self.modify(path, move |slot| *slot = info)
    }

    pub fn remove_preset(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        {
            let mut index = self.shared.index.write();
            let mut data = self.shared.data.write();
            let Some(old) = data.presets.remove(path) else {
                return false;
            };
            index.remove(&old);
            self.shared.cache.lock().remove(path);
        }
        self.shared.notify();
        true
    }

    pub fn set_favorite(&self, path: impl AsRef<Path>, favorite: bool) -> bool {
        self.modify(path.as_ref(), |info| info.is_favorite = favorite)
    }

    /// Ratings above 5 are clamped.
    pub fn set_rating(&self, path: impl AsRef<Path>, rating: u8) -> bool {
        self.modify(path.as_ref(), |info| info.set_rating(rating))
    }

    /// Count a use of the preset and touch its access time.
    pub fn record_play(&self, path: impl AsRef<Path>) -> bool {
        self.modify(path.as_ref(), |info| {
            info.play_count = info.play_count.saturating_add(1);
            info.last_accessed = SystemTime::now();
        })
    }

    fn modify(&self, path: &Path, f: impl FnOnce(&mut PresetInfo)) -> bool {
        {
            let mut index = self.shared.index.write();
            let mut data = self.shared.data.write();
            let Some(slot) = data.presets.get_mut(path) else {
                return false;
            };
            index.remove(slot);
            f(&mut *slot);
            index.insert(slot);
            self.shared.cache.lock().remove(path);
        }
        self.shared.notify();
        true
    }

    /// Rebuild every secondary index from the primary table.
    pub fn rebuild_indices(&self) {
        self.shared.rebuild_indices();
    }
}

impl Default for PresetDatabase {
    fn default() -> Self {
        Self::new(DatabaseConfig::default())
    }
}

impl Drop for PresetDatabase {
    fn drop(&mut self) {
        self.shutdown();
    }
}
