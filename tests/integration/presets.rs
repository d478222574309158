//! Preset library scanning and applying presets through the bus.

use crate::helpers::*;
use patchbay::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn test_scan_and_filter_library() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_library(dir.path());

    let patchbay = Patchbay::builder()
        .learn_config(learn_config())
        .watchdog(false)
        .preset_directory(dir.path())
        .build()
        .unwrap();
    let db = patchbay.presets();
    assert!(db.wait_for_update(Duration::from_secs(10)));

    assert_eq!(db.get_all_presets().len(), 9);
    assert_eq!(db.get_by_category("Bass").len(), 3);
    let criteria = FilterCriteria::new().category("Bass").author("John Doe");
    assert_eq!(db.filter(&criteria).len(), 2);
}

#[test]
fn test_apply_preset_pushes_parameters() {
    let dir = tempfile::tempdir().unwrap();
    write_library(dir.path());

    let patchbay = test_patchbay(64);
    assert!(patchbay.presets().add_directory(dir.path(), true));
    let mut audio = patchbay.take_audio_endpoint().unwrap();

    let path = dir.path().join("Lead").join("lead_1.json");
    assert_eq!(patchbay.apply_preset(&path).unwrap(), 2);

    let mut received = HashMap::new();
    audio.process_audio_updates(
        |c| {
            assert_eq!(c.source, ParameterSource::Preset);
            received.insert(c.id.as_str().to_string(), c.value);
        },
        64,
    );
    assert_eq!(received.len(), 2);
    assert!((received["filter_cutoff"] - 0.5).abs() < VALUE_EPSILON);
    assert!((received["osc1_level"] - 0.8).abs() < VALUE_EPSILON);

    assert_eq!(patchbay.presets().get_preset(&path).unwrap().play_count, 1);
}

#[test]
fn test_apply_preset_partial_when_bus_full() {
    let patchbay = test_patchbay(1);
    let info = PresetInfo::new("/virtual/p.json", "P")
        .with_parameter("a", 0.1)
        .with_parameter("b", 0.2);
    assert_eq!(patchbay.apply_preset_info(&info), 1);
    assert_eq!(patchbay.bus_statistics().to_audio.dropped, 1);
}

#[test]
fn test_apply_unknown_preset_fails() {
    let patchbay = test_patchbay(8);
    assert!(matches!(
        patchbay.apply_preset("/no/such/preset.json"),
        Err(patchbay::Error::Presets(_))
    ));
}

#[test]
fn test_invalid_preset_directory_fails_build() {
    let result = Patchbay::builder()
        .learn_config(learn_config())
        .watchdog(false)
        .preset_directory("/no/such/library")
        .build();
    assert!(matches!(result, Err(patchbay::Error::Presets(_))));
}
