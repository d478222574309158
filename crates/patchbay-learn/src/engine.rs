//! Learning engine: CC routing, learn sessions and persistence.
//!
//! Lock layout: mappings, statistics and the session each sit behind their
//! own mutex. When the session and the mapping table are both needed the
//! session is locked first. Every callback runs after all locks are released.

use crate::config::LearnConfig;
use crate::error::{Error, Result};
use crate::mapping::{CCMapping, CCNumber, CcKey, CurveType, MidiChannel};
use crate::persist;
use crate::session::{CcActivity, LearnRequest, LearnState, Session};
use crate::stats::{LearnStatistics, StatsState};
use crate::table::MappingTable;
use crate::watchdog::Watchdog;
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use patchbay_core::{Clock, SystemClock};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receives `(parameter_id, value)` for every routed CC.
pub type ParameterSink = dyn Fn(&str, f32) + Send + Sync;
/// Receives every state transition with a human-readable message.
pub type StateCallback = dyn Fn(LearnState, &str) + Send + Sync;
/// Receives each mapping created by a learn session.
pub type MappingCallback = dyn Fn(&CCMapping) + Send + Sync;
/// Receives the active controllers found by auto-learn.
pub type AutoLearnCallback = dyn Fn(&[CcActivity]) + Send + Sync;

#[derive(Default)]
struct Callbacks {
    parameter: RwLock<Option<Arc<ParameterSink>>>,
    state: RwLock<Option<Arc<StateCallback>>>,
    mapping_created: RwLock<Option<Arc<MappingCallback>>>,
    auto_learn: RwLock<Option<Arc<AutoLearnCallback>>>,
}

/// Collected under locks, delivered after they are released.
enum Notice {
    State(LearnState, String),
    MappingCreated(CCMapping),
    AutoLearn(Vec<CcActivity>),
}

pub(crate) struct EngineInner {
    config: ArcSwap<LearnConfig>,
    clock: Arc<dyn Clock>,
    mappings: Mutex<MappingTable>,
    stats: Mutex<StatsState>,
    session: Mutex<Session>,
    enabled: AtomicBool,
    /// Mappings changed since the last save or load.
    dirty: AtomicBool,
    callbacks: Callbacks,
}

impl EngineInner {
    fn process_cc(&self, channel: MidiChannel, cc_number: CCNumber, value: u8, device: &str) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        if channel > 15 || cc_number > 127 || value > 127 {
            tracing::debug!(
                "Ignoring out-of-range CC: channel {} cc {} value {}",
                channel,
                cc_number,
                value
            );
            return;
        }

        let now = self.clock.now();
        let previous = self.stats.lock().observe(channel, cc_number, value, now);

        let mut notices = Vec::new();
        let route = {
            let mut session = self.session.lock();
            match session.state {
                LearnState::WaitingForCc => {
                    self.advance_learn(
                        &mut session,
                        channel,
                        cc_number,
                        value,
                        previous,
                        device,
                        now,
                        &mut notices,
                    );
                    false
                }
                LearnState::Learning => {
                    session.record_activity(channel, cc_number, value, device);
                    if session.expired(now) {
                        self.finish_auto_learn(&mut session, &mut notices);
                    }
                    false
                }
                LearnState::Idle | LearnState::WaitingForParam => true,
            }
        };

        self.dispatch(notices);

        if route {
            self.route(channel, cc_number, value);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn advance_learn(
        &self,
        session: &mut Session,
        channel: MidiChannel,
        cc_number: CCNumber,
        value: u8,
        previous: Option<u8>,
        device: &str,
        now: Instant,
        notices: &mut Vec<Notice>,
    ) {
        if session.expired(now) {
            self.expire_learn(session, notices);
            return;
        }

        let accepts_channel = session
            .request
            .as_ref()
            .is_some_and(|r| r.channel_filter.map_or(true, |c| c == channel));
        if !accepts_channel {
            return;
        }

        let config = self.config.load();
        // A controller seen for the first time counts as moved.
        let moved = previous.map_or(true, |p| p.abs_diff(value) >= config.sensitivity);
        if !moved {
            return;
        }

        let Some(request) = session.request.take() else {
            return;
        };
        session.reset();

        let curve_type = if config.auto_curve_detection {
            CurveType::detect(&request.parameter_id)
        } else {
            CurveType::Linear
        };

        let mapping = CCMapping {
            channel: Some(channel),
            cc_number,
            parameter_id: request.parameter_id,
            min_value: request.min_value,
            max_value: request.max_value,
            inverted: request.inverted,
            smoothing: 0.0,
            curve_type,
            learn_time: self.clock.wall_time(),
            device_name: device.to_string(),
            is_active: true,
        };
        self.insert_mapping(mapping.clone());

        tracing::info!(
            "Learned CC {} (channel {}) -> {} ({:?})",
            cc_number,
            channel,
            mapping.parameter_id,
            curve_type
        );
        let message = format!(
            "Mapped CC {} on channel {} to {}",
            cc_number, channel, mapping.parameter_id
        );
        notices.push(Notice::MappingCreated(mapping));
        notices.push(Notice::State(LearnState::Idle, message));
    }

    fn expire_learn(&self, session: &mut Session, notices: &mut Vec<Notice>) {
        let parameter = session
            .request
            .as_ref()
            .map(|r| r.parameter_id.clone())
            .unwrap_or_default();
        session.reset();
        tracing::info!("Learning timed out for {}", parameter);
        notices.push(Notice::State(
            LearnState::Idle,
            format!("Learning timed out for {}", parameter),
        ));
    }

    fn finish_auto_learn(&self, session: &mut Session, notices: &mut Vec<Notice>) {
        let threshold = self.config.load().active_change_threshold;
        let active = session.finish_auto_learn(threshold);
        let message = format!(
            "Auto-learn finished: {} active controller(s){}",
            active.len(),
            active
                .iter()
                .map(|a| format!(" ch{}/cc{}", a.channel, a.cc_number))
                .collect::<String>()
        );
        tracing::info!("{}", message);
        notices.push(Notice::AutoLearn(active));
        notices.push(Notice::State(LearnState::Idle, message));
    }

    fn route(&self, channel: MidiChannel, cc_number: CCNumber, value: u8) {
        let target = {
            let mappings = self.mappings.lock();
            mappings
                .lookup(channel, cc_number)
                .filter(|m| m.is_active)
                .map(|m| (m.parameter_id.clone(), m.map_value(value)))
        };

        let Some((parameter_id, mapped)) = target else {
            return;
        };
        self.stats.lock().stats.mapped_messages += 1;

        let sink = self.callbacks.parameter.read().clone();
        if let Some(sink) = sink {
            sink(&parameter_id, mapped);
        }
    }

    pub(crate) fn tick(&self) {
        let now = self.clock.now();
        let mut notices = Vec::new();
        {
            let mut session = self.session.lock();
            if session.expired(now) {
                match session.state {
                    LearnState::WaitingForCc => self.expire_learn(&mut session, &mut notices),
                    LearnState::Learning => self.finish_auto_learn(&mut session, &mut notices),
                    LearnState::Idle | LearnState::WaitingForParam => {
                        session.reset();
                    }
                }
            }
        }
        self.dispatch(notices);
    }

    fn insert_mapping(&self, mapping: CCMapping) {
        let key = mapping.key();
        let parameter_id = mapping.parameter_id.clone();
        let outcome = self.mappings.lock().insert(mapping);

        if let Some(conflict) = outcome.conflict {
            tracing::warn!(
                "CC {} (channel {:?}) was mapped to {}; remapped to {}",
                key.cc_number,
                key.channel,
                conflict.parameter_id,
                parameter_id
            );
        }
        if let Some(replaced) = outcome.replaced {
            tracing::debug!(
                "Moved {} from CC {} to CC {}",
                parameter_id,
                replaced.cc_number,
                key.cc_number
            );
        }
        self.dirty.store(true, Ordering::Release);
    }

    fn dispatch(&self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::State(state, message) => {
                    tracing::debug!("Learn state -> {:?}: {}", state, message);
                    let callback = self.callbacks.state.read().clone();
                    if let Some(callback) = callback {
                        callback(state, &message);
                    }
                }
                Notice::MappingCreated(mapping) => {
                    self.stats.lock().stats.learned_mappings += 1;
                    let callback = self.callbacks.mapping_created.read().clone();
                    if let Some(callback) = callback {
                        callback(&mapping);
                    }
                }
                Notice::AutoLearn(active) => {
                    let callback = self.callbacks.auto_learn.read().clone();
                    if let Some(callback) = callback {
                        callback(&active);
                    }
                }
            }
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let snapshot = self.mappings.lock().clone();
        persist::write(path, &snapshot)?;
        self.dirty.store(false, Ordering::Release);
        tracing::debug!("Saved {} mappings to {}", snapshot.len(), path.display());
        Ok(())
    }

    fn load_from(&self, path: &Path) -> Result<usize> {
        let table = persist::read(path)?;
        let count = table.len();
        *self.mappings.lock() = table;
        self.dirty.store(false, Ordering::Release);
        tracing::info!("Loaded {} mappings from {}", count, path.display());
        Ok(count)
    }
}

/// MIDI CC learning engine.
///
/// All methods take `&self`; share it behind an [`Arc`] to feed CCs from a
/// MIDI thread while the UI edits mappings.
pub struct LearnEngine {
    inner: Arc<EngineInner>,
    watchdog: Mutex<Option<Watchdog>>,
}

impl LearnEngine {
    pub fn new(config: LearnConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: LearnConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config: ArcSwap::from_pointee(config),
                clock,
                mappings: Mutex::new(MappingTable::new()),
                stats: Mutex::new(StatsState::default()),
                session: Mutex::new(Session::default()),
                enabled: AtomicBool::new(true),
                dirty: AtomicBool::new(false),
                callbacks: Callbacks::default(),
            }),
            watchdog: Mutex::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn config(&self) -> LearnConfig {
        (**self.inner.config.load()).clone()
    }

    fn update_config(&self, f: impl Fn(&mut LearnConfig)) {
        self.inner.config.rcu(|current| {
            let mut next = (**current).clone();
            f(&mut next);
            next
        });
    }

    pub fn set_sensitivity(&self, sensitivity: u8) {
        self.update_config(|c| c.sensitivity = sensitivity);
    }

    pub fn set_auto_curve_detection(&self, enabled: bool) {
        self.update_config(|c| c.auto_curve_detection = enabled);
    }

    pub fn set_default_timeout(&self, timeout: Duration) {
        self.update_config(|c| c.learn_timeout = timeout);
    }

    /// Disabled engines ignore every CC message.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    pub fn set_parameter_sink(&self, sink: Arc<ParameterSink>) {
        *self.inner.callbacks.parameter.write() = Some(sink);
    }

    pub fn set_state_callback(&self, callback: Arc<StateCallback>) {
        *self.inner.callbacks.state.write() = Some(callback);
    }

    pub fn set_mapping_callback(&self, callback: Arc<MappingCallback>) {
        *self.inner.callbacks.mapping_created.write() = Some(callback);
    }

    pub fn set_auto_learn_callback(&self, callback: Arc<AutoLearnCallback>) {
        *self.inner.callbacks.auto_learn.write() = Some(callback);
    }

    pub fn clear_callbacks(&self) {
        *self.inner.callbacks.parameter.write() = None;
        *self.inner.callbacks.state.write() = None;
        *self.inner.callbacks.mapping_created.write() = None;
        *self.inner.callbacks.auto_learn.write() = None;
    }

    // ------------------------------------------------------------------
    // MIDI input
    // ------------------------------------------------------------------

    /// Feed one CC message. Completes a learn session, accrues auto-learn
    /// activity, or routes the value through the matching mapping.
    pub fn process_midi_cc(&self, channel: MidiChannel, cc_number: CCNumber, value: u8, device: &str) {
        self.inner.process_cc(channel, cc_number, value, device);
    }

    /// Evaluate session deadlines without waiting for MIDI traffic.
    pub fn tick(&self) {
        self.inner.tick();
    }

    // ------------------------------------------------------------------
    // Learn sessions
    // ------------------------------------------------------------------

    /// Returns `false` if the parameter is already mapped or the engine is disabled.
    pub fn start_learning(&self, parameter_id: &str, timeout: Duration) -> bool {
        self.start_learning_with(LearnRequest::new(parameter_id).timeout(timeout))
    }

    pub fn start_learning_with(&self, request: LearnRequest) -> bool {
        match self.try_start_learning(request) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Learn request rejected: {}", e);
                false
            }
        }
    }

    pub fn try_start_learning(&self, request: LearnRequest) -> Result<()> {
        if !self.is_enabled() {
            return Err(Error::Disabled);
        }
        if request.parameter_id.is_empty() {
            return Err(Error::InvalidMapping("empty parameter id".to_string()));
        }
        if request.min_value > request.max_value {
            return Err(Error::InvalidMapping(format!(
                "min {} greater than max {}",
                request.min_value, request.max_value
            )));
        }

        let timeout = request
            .timeout
            .unwrap_or_else(|| self.inner.config.load().learn_timeout);

        let message = {
            let mut session = self.inner.session.lock();
            if self
                .inner
                .mappings
                .lock()
                .contains_parameter(&request.parameter_id)
            {
                return Err(Error::AlreadyMapped(request.parameter_id));
            }
            if session.state != LearnState::Idle {
                tracing::debug!("Replacing {:?} session", session.state);
            }

            let message = format!("Waiting for a controller for {}", request.parameter_id);
            session.begin_learn(request, self.inner.clock.now() + timeout);
            message
        };

        self.inner
            .dispatch(vec![Notice::State(LearnState::WaitingForCc, message)]);
        Ok(())
    }

    /// Survey controller activity for `duration`, then report the active ones.
    pub fn start_auto_learning(&self, duration: Duration) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.inner
            .session
            .lock()
            .begin_auto_learn(self.inner.clock.now() + duration);
        self.inner.dispatch(vec![Notice::State(
            LearnState::Learning,
            format!("Auto-learning for {} ms", duration.as_millis()),
        )]);
        true
    }

    /// Auto-learn with the configured duration.
    pub fn start_default_auto_learning(&self) -> bool {
        let duration = self.inner.config.load().auto_learn_duration;
        self.start_auto_learning(duration)
    }

    pub fn stop_learning(&self) {
        let previous = self.inner.session.lock().reset();
        if previous != LearnState::Idle {
            self.inner.dispatch(vec![Notice::State(
                LearnState::Idle,
                "Learning stopped".to_string(),
            )]);
        }
    }

    pub fn state(&self) -> LearnState {
        self.inner.session.lock().state
    }

    pub fn is_learning(&self) -> bool {
        self.state() != LearnState::Idle
    }

    pub fn learning_target(&self) -> Option<String> {
        self.inner
            .session
            .lock()
            .request
            .as_ref()
            .map(|r| r.parameter_id.clone())
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        let deadline = self.inner.session.lock().deadline?;
        Some(deadline.saturating_duration_since(self.inner.clock.now()))
    }

    // ------------------------------------------------------------------
    // Mapping table
    // ------------------------------------------------------------------

    /// Insert a mapping directly. An existing mapping for the same parameter
    /// is replaced; one for the same controller is overwritten.
    pub fn add_mapping(&self, mapping: CCMapping) -> Result<()> {
        mapping.validate().map_err(Error::InvalidMapping)?;
        self.inner.insert_mapping(mapping);
        Ok(())
    }

    /// Replace the mapping of an already mapped parameter.
    pub fn update_mapping(&self, mapping: CCMapping) -> bool {
        if !self.is_parameter_mapped(&mapping.parameter_id) {
            return false;
        }
        match self.add_mapping(mapping) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Rejected mapping update: {}", e);
                false
            }
        }
    }

    pub fn remove_mapping(&self, parameter_id: &str) -> bool {
        let removed = self.inner.mappings.lock().remove_parameter(parameter_id);
        if removed.is_some() {
            self.inner.dirty.store(true, Ordering::Release);
        }
        removed.is_some()
    }

    pub fn remove_mapping_for_cc(&self, channel: Option<MidiChannel>, cc_number: CCNumber) -> bool {
        let removed = self
            .inner
            .mappings
            .lock()
            .remove_key(CcKey::new(channel, cc_number));
        if removed.is_some() {
            self.inner.dirty.store(true, Ordering::Release);
        }
        removed.is_some()
    }

    pub fn set_mapping_active(&self, parameter_id: &str, active: bool) -> bool {
        let mut mappings = self.inner.mappings.lock();
        let Some(key) = mappings.key_for_parameter(parameter_id) else {
            return false;
        };
        match mappings.get_mut(&key) {
            Some(mapping) => {
                mapping.is_active = active;
                self.inner.dirty.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn clear_all_mappings(&self) {
        let mut mappings = self.inner.mappings.lock();
        if !mappings.is_empty() {
            mappings.clear();
            self.inner.dirty.store(true, Ordering::Release);
        }
    }

    pub fn get_mapping(&self, parameter_id: &str) -> Option<CCMapping> {
        self.inner
            .mappings
            .lock()
            .get_parameter(parameter_id)
            .cloned()
    }

    /// Same precedence as CC routing: exact channel, then any channel.
    pub fn get_mapping_for_cc(&self, channel: MidiChannel, cc_number: CCNumber) -> Option<CCMapping> {
        self.inner
            .mappings
            .lock()
            .lookup(channel, cc_number)
            .cloned()
    }

    pub fn get_all_mappings(&self) -> Vec<CCMapping> {
        self.inner.mappings.lock().iter().cloned().collect()
    }

    pub fn get_mappings_for_device(&self, device_name: &str) -> Vec<CCMapping> {
        self.inner
            .mappings
            .lock()
            .iter()
            .filter(|m| m.device_name == device_name)
            .cloned()
            .collect()
    }

    pub fn is_parameter_mapped(&self, parameter_id: &str) -> bool {
        self.inner.mappings.lock().contains_parameter(parameter_id)
    }

    pub fn mapping_count(&self) -> usize {
        self.inner.mappings.lock().len()
    }

    /// Copy of the whole table.
    pub fn mapping_table(&self) -> MappingTable {
        self.inner.mappings.lock().clone()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Returns `false` on failure; the cause is logged.
    pub fn save_mappings(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_save_mappings(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to save mappings to {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn try_save_mappings(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.save_to(path.as_ref())
    }

    /// Replaces the table with the file's contents. On failure the current
    /// table is left untouched.
    pub fn load_mappings(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_load_mappings(path) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to load mappings from {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Returns the number of mappings loaded.
    pub fn try_load_mappings(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.inner.load_from(path.as_ref())
    }

    /// Save to the configured mapping file.
    pub fn save_default_mappings(&self) -> Result<()> {
        let config = self.inner.config.load();
        let path = config.mapping_file.as_deref().ok_or(Error::NoMappingFile)?;
        self.inner.save_to(path)
    }

    /// Load from the configured mapping file.
    pub fn load_default_mappings(&self) -> Result<usize> {
        let config = self.inner.config.load();
        let path = config.mapping_file.as_deref().ok_or(Error::NoMappingFile)?;
        self.inner.load_from(path)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn statistics(&self) -> LearnStatistics {
        let mut stats = self.inner.stats.lock().stats.clone();
        stats.mapping_count = self.mapping_count();
        stats
    }

    pub fn reset_statistics(&self) {
        self.inner.stats.lock().reset();
    }

    // ------------------------------------------------------------------
    // Watchdog
    // ------------------------------------------------------------------

    /// Spawn a thread that calls [`tick`](Self::tick) every
    /// `watchdog_interval`, so timeouts fire without MIDI input.
    pub fn start_watchdog(&self) -> Result<()> {
        let mut watchdog = self.watchdog.lock();
        if watchdog.is_some() {
            return Ok(());
        }
        let interval = self.inner.config.load().watchdog_interval;
        *watchdog = Some(Watchdog::spawn(Arc::downgrade(&self.inner), interval)?);
        Ok(())
    }

    pub fn stop_watchdog(&self) {
        let watchdog = self.watchdog.lock().take();
        if let Some(mut watchdog) = watchdog {
            watchdog.stop();
        }
    }
}

impl Default for LearnEngine {
    fn default() -> Self {
        Self::new(LearnConfig::default())
    }
}

impl Drop for LearnEngine {
    fn drop(&mut self) {
        self.stop_watchdog();

        let config = self.inner.config.load();
        if !config.save_on_drop || !self.inner.dirty.load(Ordering::Acquire) {
            return;
        }
        if let Some(path) = config.mapping_file.as_deref() {
            if let Err(e) = self.inner.save_to(path) {
                tracing::warn!("Could not save mappings on shutdown: {}", e);
            }
        }
    }
}
