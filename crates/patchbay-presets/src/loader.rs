//! Reading preset files into [`PresetInfo`].

use crate::error::{Error, Result};
use crate::info::{AudioCharacteristics, PresetInfo};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Extracts metadata from one preset file.
///
/// Implementations are called from the scanner thread and from
/// on-demand lookups, so they must be thread-safe.
pub trait MetadataLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<PresetInfo>;
}

/// Check if a path has one of the accepted extensions (case-insensitive).
pub fn is_preset_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|accepted| accepted.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Loader for JSON-based preset formats.
///
/// Metadata is read from the top level or from a nested `metadata` object.
/// Name falls back to the file stem and category to the parent directory.
/// Numeric entries of `parameters` (or `settings`) become the parameter map.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataLoader;

impl JsonMetadataLoader {
    pub fn new() -> Self {
        Self
    }

    /// Build a record from an already parsed document.
    pub fn from_document(path: &Path, document: &Value) -> PresetInfo {
        let root = document.as_object();
        let meta = root
            .and_then(|r| r.get("metadata"))
            .and_then(Value::as_object)
            .or(root);

        let text = |key: &str| -> Option<String> {
            meta.and_then(|m| m.get(key))
                .or_else(|| root.and_then(|r| r.get(key)))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut info = PresetInfo {
            file_path: path.to_path_buf(),
            ..Default::default()
        };

        info.name = text("name")
            .or_else(|| text("preset_name"))
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        info.category = text("category")
            .or_else(|| {
                path.parent()
                    .and_then(|p| p.file_name())
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        info.author = text("author").unwrap_or_default();
        info.description = text("description")
            .or_else(|| text("comments"))
            .unwrap_or_default();
        info.license = text("license").unwrap_or_default();

        if let Some(meta) = meta {
            info.tags = read_tags(meta.get("tags"));
            if let Some(rating) = meta.get("rating").and_then(Value::as_u64) {
                info.set_rating(rating.min(u8::MAX as u64) as u8);
            }
            info.is_favorite = meta
                .get("favorite")
                .and_then(Value::as_bool)
                .unwrap_or(false);
        }

        info.parameters = root
            .and_then(|r| r.get("parameters").or_else(|| r.get("settings")))
            .or_else(|| meta.and_then(|m| m.get("parameters")))
            .and_then(Value::as_object)
            .map(numeric_entries)
            .unwrap_or_default();
        info.needs_parameter_analysis = info.parameters.is_empty();
        info.audio = AudioCharacteristics::from_parameters(&info.parameters);
        info
    }
}

impl MetadataLoader for JsonMetadataLoader {
    fn load(&self, path: &Path) -> Result<PresetInfo> {
        if !path.is_file() {
            return Err(Error::NotAPreset(path.to_path_buf()));
        }

        let text = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&text)?;
        let mut info = Self::from_document(path, &document);

        let fs_meta = fs::metadata(path)?;
        let modified = fs_meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        info.file_size = fs_meta.len();
        info.modified = modified;
        // Not every filesystem records creation time.
        info.created = fs_meta.created().unwrap_or(modified);
        info.last_accessed = fs_meta.accessed().unwrap_or(modified);
        Ok(info)
    }
}

/// Tags as an array of strings or one comma-separated string.
fn read_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn numeric_entries(object: &Map<String, Value>) -> BTreeMap<String, f32> {
    object
        .iter()
        .filter_map(|(k, v)| {
            let value = match v {
                Value::Number(n) => n.as_f64()?,
                Value::Bool(b) => f64::from(u8::from(*b)),
                _ => return None,
            };
            Some((k.clone(), value as f32))
        })
        .collect()
}
