//! Timeout thread for learn sessions.

use crate::engine::EngineInner;
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Ticks the engine at a fixed interval so sessions expire without MIDI traffic.
///
/// Holds only a weak reference; the thread exits once the engine is gone.
pub(crate) struct Watchdog {
    shutdown: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub(crate) fn spawn(engine: Weak<EngineInner>, interval: Duration) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (wake_tx, wake_rx) = bounded::<()>(1);
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("patchbay-learn-watchdog".into())
            .spawn(move || {
                while !thread_shutdown.load(Ordering::Acquire) {
                    match wake_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    match engine.upgrade() {
                        Some(engine) => engine.tick(),
                        None => break,
                    }
                }
                tracing::trace!("Learn watchdog exited");
            })
            .map_err(|e| Error::Thread(e.to_string()))?;

        Ok(Self {
            shutdown,
            wake_tx,
            handle: Some(handle),
        })
    }

    pub(crate) fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.wake_tx.try_send(());

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
