//! MIDI learn driving the bus.

use crate::helpers::*;
use approx::assert_abs_diff_eq;
use patchbay::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn test_learned_cc_reaches_audio() {
    init_tracing();
    let patchbay = test_patchbay(64);
    let mut audio = patchbay.take_audio_endpoint().unwrap();

    assert!(patchbay
        .learn()
        .start_learning("filter_cutoff", Duration::from_secs(3)));
    patchbay.process_midi_cc(0, 74, 64, "Keystep");

    let mapping = patchbay.learn().get_mapping("filter_cutoff").unwrap();
    assert_eq!(mapping.curve_type, CurveType::SShape);

    patchbay.process_midi_cc(0, 74, 127, "Keystep");
    patchbay.process_midi_cc(5, 74, 127, "Keystep"); // other channel: unmapped

    let mut received = Vec::new();
    audio.process_audio_updates(|c| received.push(*c), 64);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, "filter_cutoff");
    assert_eq!(received[0].source, ParameterSource::Midi);
    assert_abs_diff_eq!(received[0].value, 1.0, epsilon = VALUE_EPSILON);
}

#[test]
fn test_watchdog_times_out_learning() {
    let patchbay = Patchbay::builder()
        .learn_config(LearnConfig {
            watchdog_interval: Duration::from_millis(5),
            ..learn_config()
        })
        .build()
        .unwrap();

    assert!(patchbay.learn().start_learning("x", Duration::from_millis(100)));
    let deadline = Instant::now() + Duration::from_secs(5);
    while patchbay.learn().state() != LearnState::Idle && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(patchbay.learn().state(), LearnState::Idle);
    assert!(!patchbay.learn().is_parameter_mapped("x"));
}

#[test]
fn test_mappings_loaded_at_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("maps.json");

    {
        let engine = LearnEngine::new(learn_config());
        engine
            .add_mapping(CCMapping::new(Some(1), 7, "master_volume"))
            .unwrap();
        assert!(engine.save_mappings(&path));
    }

    let patchbay = Patchbay::builder()
        .learn_config(LearnConfig {
            mapping_file: Some(path),
            ..learn_config()
        })
        .watchdog(false)
        .build()
        .unwrap();
    assert!(patchbay.learn().is_parameter_mapped("master_volume"));
}
