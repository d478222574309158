//! Bus behavior seen through the host.

use crate::helpers::*;
use patchbay::prelude::*;
use patchbay::ParameterBus;

#[test]
fn test_bus_drop_accounting() {
    let (mut ui, mut audio) = ParameterBus::with_capacity(4).unwrap().split();

    let accepted = (0..6)
        .filter(|i| ui.push_to_audio("gain", *i as f32, ParameterSource::Ui))
        .count();
    assert_eq!(accepted, 4);

    let stats = ui.statistics();
    assert_eq!(stats.to_audio.pushed, 4);
    assert_eq!(stats.to_audio.dropped, 2);
    assert_eq!(stats.to_audio.size, 4);

    let mut values = Vec::new();
    assert_eq!(audio.process_audio_updates(|c| values.push(c.value), 16), 4);
    assert_eq!(values, [0.0, 1.0, 2.0, 3.0]);

    let stats = ui.statistics();
    assert_eq!(stats.to_audio.size, 0);
    assert_eq!(stats.total_updates(), 4);
}

#[test]
fn test_host_push_and_feedback() {
    init_tracing();
    let patchbay = test_patchbay(8);
    let mut audio = patchbay.take_audio_endpoint().unwrap();
    assert!(patchbay.take_audio_endpoint().is_none());

    assert!(patchbay.push_parameter("volume", 0.5, ParameterSource::Automation));
    let mut received = Vec::new();
    audio.process_audio_updates(|c| received.push(*c), 8);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, "volume");
    assert_eq!(received[0].source, ParameterSource::Automation);

    assert!(audio.push_to_ui("meter", 0.9, ParameterSource::Internal));
    let mut feedback = Vec::new();
    assert_eq!(patchbay.process_ui_updates(|c| feedback.push(c.value), 8), 1);
    assert_eq!(feedback, [0.9]);
}

#[test]
fn test_capacity_from_config() {
    let config = PatchbayConfig::from_json(r#"{ "bus": { "capacity": 16, "logging": true } }"#).unwrap();
    let patchbay = Patchbay::builder()
        .config(config)
        .learn_config(learn_config())
        .watchdog(false)
        .build()
        .unwrap();

    let monitor = patchbay.monitor();
    assert_eq!(monitor.capacity(), 16);
    assert!(monitor.is_logging_enabled());
}

#[test]
fn test_zero_capacity_rejected() {
    let result = Patchbay::builder()
        .bus_capacity(0)
        .learn_config(learn_config())
        .watchdog(false)
        .build();
    assert!(matches!(result, Err(patchbay::Error::Core(_))));
}

#[test]
fn test_feedback_sink_can_reenter_host() {
    let patchbay = test_patchbay(16);
    let mut audio = patchbay.take_audio_endpoint().unwrap();
    assert!(patchbay
        .learn()
        .start_learning("resonance", std::time::Duration::from_secs(3)));
    patchbay.process_midi_cc(0, 71, 10, "Keystep");

    assert!(audio.push_to_ui("meter", 0.9, ParameterSource::Internal));
    assert!(audio.push_to_ui("meter", 0.7, ParameterSource::Internal));

    // Echo every feedback value back to audio from inside the sink, through
    // both the host push and the learned controller.
    let drained = patchbay.process_ui_updates(
        |change| {
            assert!(patchbay.push_parameter("echo", change.value, ParameterSource::Ui));
            patchbay.process_midi_cc(0, 71, 127, "Keystep");
        },
        8,
    );
    assert_eq!(drained, 2);

    let mut received = Vec::new();
    audio.process_audio_updates(|c| received.push((c.id, c.source)), 16);
    assert_eq!(received.len(), 4);
    assert_eq!(received.iter().filter(|(id, _)| *id == "echo").count(), 2);
    assert!(received
        .iter()
        .any(|(id, source)| *id == "resonance" && *source == ParameterSource::Midi));
}
