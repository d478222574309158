//! Test helpers and fixtures for patchbay integration tests

use patchbay::prelude::*;
use std::path::Path;

/// Tolerance for mapped CC values.
pub const VALUE_EPSILON: f32 = 1e-5;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Learn settings that never touch the working directory.
pub fn learn_config() -> LearnConfig {
    LearnConfig {
        save_on_drop: false,
        mapping_file: None,
        ..Default::default()
    }
}

/// Patchbay without a watchdog or mapping file.
pub fn test_patchbay(capacity: usize) -> Patchbay {
    Patchbay::builder()
        .bus_capacity(capacity)
        .learn_config(learn_config())
        .watchdog(false)
        .build()
        .unwrap()
}

/// Write a JSON preset, creating parent directories.
pub fn write_preset(path: &Path, body: serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
}

/// Three presets in each of Bass, Lead and Pad; two Bass presets by John Doe.
pub fn write_library(root: &Path) {
    let layout = [
        ("Bass", ["John Doe", "John Doe", "Ann"]),
        ("Lead", ["Kim", "Ann", "John Doe"]),
        ("Pad", ["Ann", "Kim", "Kim"]),
    ];
    for (category, authors) in layout {
        for (i, author) in authors.iter().enumerate() {
            write_preset(
                &root.join(category).join(format!("{}_{}.json", category.to_lowercase(), i)),
                serde_json::json!({
                    "name": format!("{category} {i}"),
                    "author": author,
                    "parameters": {
                        "filter_cutoff": 0.25 * (i + 1) as f64,
                        "osc1_level": 0.8
                    }
                }),
            );
        }
    }
}
