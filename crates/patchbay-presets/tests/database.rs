//! Scanning, querying and property checks for the preset database.

use approx::assert_abs_diff_eq;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use patchbay_presets::{
    hit_rate_percent, sort_presets, DatabaseConfig, FilterCriteria, JsonMetadataLoader,
    MetadataLoader, PresetDatabase, PresetInfo, SortCriteria, SortDirection,
};
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// JSON loader that parks the first `load` until the test releases it.
struct GatedLoader {
    inner: JsonMetadataLoader,
    armed: AtomicBool,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl GatedLoader {
    /// Returns the loader, a receiver signalled when the scan is parked, and
    /// the sender that lets it continue.
    fn new() -> (Arc<Self>, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let loader = Arc::new(Self {
            inner: JsonMetadataLoader::new(),
            armed: AtomicBool::new(true),
            entered: entered_tx,
            release: release_rx,
        });
        (loader, entered_rx, release_tx)
    }
}

impl MetadataLoader for GatedLoader {
    fn load(&self, path: &Path) -> patchbay_presets::Result<PresetInfo> {
        if self.armed.swap(false, Ordering::AcqRel) {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(Duration::from_secs(10));
        }
        self.inner.load(path)
    }
}

fn write_json(path: &Path, body: serde_json::Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
}

/// Three presets in each of Bass, Lead and Pad.
fn library(root: &Path) {
    let authors = [
        ("Bass", ["John Doe", "John Doe", "Ann"]),
        ("Lead", ["John Doe", "Ann", "Kim"]),
        ("Pad", ["Kim", "Kim", "Ann"]),
    ];
    for (category, names) in authors {
        for (i, author) in names.iter().enumerate() {
            write_json(
                &root.join(category).join(format!("{category}_{i}.json")),
                serde_json::json!({
                    "name": format!("{category} {i}"),
                    "author": author,
                    "tags": [category.to_lowercase()],
                    "parameters": { "filter_cutoff": 0.1 * i as f64 }
                }),
            );
        }
    }
}

#[test]
fn scan_and_filter() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());
    fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

    let db = PresetDatabase::default();
    assert!(db.initialize(&[dir.path()]));
    assert!(db.wait_for_update(Duration::from_secs(10)));

    assert_eq!(db.get_all_presets().len(), 9);
    assert_eq!(db.get_by_category("Bass").len(), 3);
    let criteria = FilterCriteria::new().category("Bass").author("John Doe");
    assert_eq!(db.filter(&criteria).len(), 2);

    assert_eq!(db.get_all_categories(), ["Bass", "Lead", "Pad"]);
    assert_eq!(db.get_all_authors(), ["Ann", "John Doe", "Kim"]);
    assert_eq!(db.search_by_name("lead").len(), 3);

    let stats = db.get_statistics();
    assert_eq!(stats.total_presets, 9);
    assert_eq!(stats.directory_count, 1);
    assert_eq!(stats.scans_completed, 1);
    assert!(!stats.is_updating);
}

#[test]
fn initialize_skips_invalid_roots() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let db = PresetDatabase::default();
    let missing = dir.path().join("missing");
    assert!(db.initialize(&[missing.as_path(), dir.path()]));
    assert!(db.wait_for_scan());
    assert_eq!(db.len(), 9);
    assert_eq!(db.directories(), vec![dir.path().to_path_buf()]);
}

#[test]
fn non_recursive_scan_sees_top_level_only() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());
    write_json(&dir.path().join("top.json"), serde_json::json!({ "name": "Top" }));

    let db = PresetDatabase::new(DatabaseConfig {
        recursive: false,
        ..Default::default()
    });
    assert!(db.initialize(&[dir.path()]));
    assert!(db.wait_for_update(Duration::from_secs(10)));
    assert_eq!(db.len(), 1);
    assert_eq!(db.get_all_presets()[0].name, "Top");
}

#[test]
fn rescan_tracks_filesystem_and_keeps_user_data() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let db = PresetDatabase::default();
    let notified = Arc::new(Mutex::new(Vec::new()));
    let cb_notified = Arc::clone(&notified);
    db.set_update_callback(Arc::new(move |presets: &[PresetInfo]| {
        cb_notified.lock().push(presets.len());
    }));

    assert!(db.initialize(&[dir.path()]));
    assert!(db.wait_for_update(Duration::from_secs(10)));

    let keep = dir.path().join("Pad").join("Pad_0.json");
    assert!(db.set_favorite(&keep, true));
    fs::remove_file(dir.path().join("Lead").join("Lead_2.json")).unwrap();
    write_json(
        &dir.path().join("Keys").join("Rhodes.json"),
        serde_json::json!({ "name": "Rhodes", "author": "Kim" }),
    );

    assert!(db.rescan());
    assert!(db.wait_for_update(Duration::from_secs(10)));

    assert_eq!(db.len(), 9);
    assert_eq!(db.get_by_category("Lead").len(), 2);
    assert_eq!(db.get_by_category("Keys").len(), 1);
    assert!(db.get_preset(&keep).unwrap().is_favorite);
    assert_eq!(db.get_favorites().len(), 1);

    let notified = notified.lock();
    assert_eq!(notified.first(), Some(&9));
    assert_eq!(notified.last(), Some(&9));
}

#[test]
fn shutdown_releases_waiters() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let db = PresetDatabase::default();
    assert!(db.initialize(&[dir.path()]));
    db.shutdown();
    assert!(!db.is_updating());
    assert!(db.wait_for_update(Duration::from_millis(10)));

    // Queries still work after shutdown.
    let _ = db.get_all_presets();
}

#[test]
fn add_directory_after_shutdown_still_loads() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_json(
        &dir.path().join("Lead").join("Saw.json"),
        serde_json::json!({ "name": "Saw", "parameters": { "filter_cutoff": 0.25 } }),
    );

    let db = PresetDatabase::default();
    db.shutdown();
    assert_eq!(db.try_add_directory(dir.path(), true).unwrap(), 1);
    assert_eq!(db.len(), 1);

    let saw = &db.search_by_name("saw")[0];
    assert_abs_diff_eq!(saw.parameters["filter_cutoff"], 0.25, epsilon = 1e-6);
}

#[test]
fn directory_removed_mid_scan_stays_empty() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("Bass").join("a.json"), serde_json::json!({ "name": "A" }));
    write_json(&dir.path().join("Bass").join("b.json"), serde_json::json!({ "name": "B" }));

    let (loader, entered, release) = GatedLoader::new();
    let db = PresetDatabase::with_loader(DatabaseConfig::default(), loader);
    assert!(db.initialize(&[dir.path()]));
    entered.recv_timeout(Duration::from_secs(10)).unwrap();

    assert!(db.remove_directory(dir.path()));
    release.send(()).unwrap();
    assert!(db.wait_for_update(Duration::from_secs(10)));

    assert!(db.directories().is_empty());
    assert_eq!(db.len(), 0);
    assert!(db.get_by_category("Bass").is_empty());
    assert!(db.get_all_categories().is_empty());
}

#[test]
fn queries_stay_available_while_scanning() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let (loader, entered, release) = GatedLoader::new();
    let db = PresetDatabase::with_loader(DatabaseConfig::default(), loader);
    assert!(db.add_preset(PresetInfo::new("/elsewhere/solo.json", "Solo").with_author("Ann")));

    assert!(db.initialize(&[dir.path()]));
    entered.recv_timeout(Duration::from_secs(10)).unwrap();

    assert!(db.is_updating());
    assert!(!db.wait_for_update(Duration::from_millis(10)));
    assert!(db.get_statistics().is_updating);
    assert_eq!(db.get_all_presets().len(), 1);
    assert_eq!(db.filter(&FilterCriteria::new().author("Ann")).len(), 1);
    assert_eq!(db.search_by_name("solo").len(), 1);

    release.send(()).unwrap();
    assert!(db.wait_for_update(Duration::from_secs(10)));
    assert!(!db.is_updating());
    assert_eq!(db.len(), 10);
    assert_eq!(db.filter(&FilterCriteria::new().author("Ann")).len(), 4);
}

#[test]
fn sort_by_size_and_date() {
    let mut presets: Vec<PresetInfo> = (0..4)
        .map(|i| {
            let mut p = PresetInfo::new(format!("/p/{i}.json"), format!("P{i}"));
            p.file_size = [300, 100, 400, 200][i];
            p
        })
        .collect();

    sort_presets(&mut presets, SortCriteria::FileSize, SortDirection::Ascending);
    let sizes: Vec<u64> = presets.iter().map(|p| p.file_size).collect();
    assert_eq!(sizes, [100, 200, 300, 400]);

    PresetDatabase::sort(&mut presets, SortCriteria::FileSize, SortDirection::Descending);
    assert_eq!(presets[0].file_size, 400);
}

fn arb_preset() -> impl Strategy<Value = PresetInfo> {
    (
        0usize..1000,
        prop::sample::select(vec!["Bass", "Lead", "Pad"]),
        prop::sample::select(vec!["Ann", "John Doe", "Kim"]),
        0u8..=5,
        any::<bool>(),
        0u32..4,
    )
        .prop_map(|(id, category, author, rating, favorite, plays)| {
            let mut p = PresetInfo::new(format!("/lib/{id}.json"), format!("Preset {id}"))
                .with_category(category)
                .with_author(author);
            p.user_rating = rating;
            p.is_favorite = favorite;
            p.play_count = plays;
            p
        })
}

fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        prop::option::of(prop::sample::select(vec!["Bass", "Lead", "Pad"])),
        prop::option::of(prop::sample::select(vec!["Ann", "John Doe", "Kim"])),
        0u8..=5,
        any::<bool>(),
    )
        .prop_map(|(category, author, min_rating, favorites)| {
            let mut c = FilterCriteria::new().min_rating(min_rating);
            if let Some(category) = category {
                c = c.category(category);
            }
            if let Some(author) = author {
                c = c.author(author);
            }
            if favorites {
                c = c.favorites_only();
            }
            c
        })
}

proptest! {
    #[test]
    fn prop_filter_results_satisfy_criteria(
        presets in proptest::collection::vec(arb_preset(), 0..40),
        criteria in arb_criteria(),
    ) {
        let db = PresetDatabase::default();
        for p in &presets {
            db.add_preset(p.clone());
        }
        let result = db.filter(&criteria);
        for p in &result {
            prop_assert!(criteria.matches(p));
            prop_assert!(p.user_rating >= criteria.min_rating);
        }
        let expected = db.get_all_presets().iter().filter(|p| criteria.matches(p)).count();
        prop_assert_eq!(result.len(), expected);
    }

    #[test]
    fn prop_sort_is_stable(presets in proptest::collection::vec(arb_preset(), 0..40)) {
        let mut list = presets;
        sort_presets(&mut list, SortCriteria::PlayCount, SortDirection::Ascending);
        sort_presets(&mut list, SortCriteria::Rating, SortDirection::Descending);

        for pair in list.windows(2) {
            prop_assert!(pair[0].user_rating >= pair[1].user_rating);
            if pair[0].user_rating == pair[1].user_rating {
                prop_assert!(pair[0].play_count <= pair[1].play_count);
            }
        }
    }

    #[test]
    fn prop_hit_rate_identity(hits in 0u64..10_000, misses in 0u64..10_000) {
        prop_assume!(hits + misses > 0);
        let expected = (hits as f64 / (hits + misses) as f64 * 100.0).round() as u32;
        prop_assert_eq!(hit_rate_percent(hits, misses), expected);
    }
}
