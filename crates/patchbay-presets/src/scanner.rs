//! Background scanner thread.

use crate::database::Shared;
use crate::error::{Error, Result};
use crate::loader::is_preset_file;
use crossbeam_channel::{unbounded, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) enum ScanCommand {
    /// Rescan every watched root.
    ScanAll,
    Shutdown,
}

/// Single worker that performs full scans on request.
pub(crate) struct Scanner {
    command_tx: Sender<ScanCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Scanner {
    pub(crate) fn spawn(shared: Arc<Shared>) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();

        let handle = thread::Builder::new()
            .name("patchbay-preset-scanner".into())
            .spawn(move || {
                for command in command_rx.iter() {
                    match command {
                        ScanCommand::ScanAll => {
                            shared.scan_all();
                            shared.finish_update();
                        }
                        ScanCommand::Shutdown => break,
                    }
                }
                tracing::debug!("Preset scanner exited");
            })
            .map_err(|e| Error::Thread(e.to_string()))?;

        Ok(Self {
            command_tx,
            handle: Some(handle),
        })
    }

    /// Queue a full scan. Returns false if the worker is gone.
    pub(crate) fn request_scan(&self) -> bool {
        self.command_tx.send(ScanCommand::ScanAll).is_ok()
    }

    /// Joins the worker. The caller raises the stop flag first so a scan in
    /// progress ends after the current file.
    pub(crate) fn stop(&mut self) {
        let _ = self.command_tx.send(ScanCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// List preset files under `root`, sorted for a stable scan order.
///
/// Unreadable subdirectories are logged and skipped.
pub(crate) fn collect_preset_files(
    root: &Path,
    recursive: bool,
    extensions: &[String],
    stop: &AtomicBool,
) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read directory {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if is_preset_file(&path, extensions) {
                files.push(path);
            }
        }
    }

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_respects_recursion_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("Bass");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(sub.join("b.vital"), "{}").unwrap();

        let exts = crate::config::DatabaseConfig::default().extensions;
        let stop = AtomicBool::new(false);

        let flat = collect_preset_files(dir.path(), false, &exts, &stop);
        assert_eq!(flat, vec![dir.path().join("a.json")]);

        let deep = collect_preset_files(dir.path(), true, &exts, &stop);
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_collect_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        let exts = crate::config::DatabaseConfig::default().extensions;
        let stop = AtomicBool::new(true);
        assert!(collect_preset_files(dir.path(), true, &exts, &stop).is_empty());
    }
}
