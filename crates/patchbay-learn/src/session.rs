//! Learn session state machine.

use crate::mapping::{CCNumber, CcKey, MidiChannel};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LearnState {
    #[default]
    Idle,
    /// Waiting for a controller to move far enough to bind the target parameter.
    WaitingForCc,
    /// Auto-learn survey in progress.
    Learning,
    /// Reserved: a controller is selected and awaits a parameter.
    WaitingForParam,
}

/// Parameters of a learn session.
#[derive(Debug, Clone)]
pub struct LearnRequest {
    pub parameter_id: String,
    /// `None` uses the configured default timeout.
    pub timeout: Option<Duration>,
    pub min_value: f32,
    pub max_value: f32,
    pub inverted: bool,
    /// Only accept controllers on this channel. `None` = any channel.
    pub channel_filter: Option<MidiChannel>,
}

impl LearnRequest {
    pub fn new(parameter_id: impl Into<String>) -> Self {
        Self {
            parameter_id: parameter_id.into(),
            timeout: None,
            min_value: 0.0,
            max_value: 1.0,
            inverted: false,
            channel_filter: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn range(mut self, min_value: f32, max_value: f32) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn channel(mut self, channel: MidiChannel) -> Self {
        self.channel_filter = Some(channel);
        self
    }
}

/// Per-controller activity seen during auto-learn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcActivity {
    pub channel: MidiChannel,
    pub cc_number: CCNumber,
    /// Messages whose value differed from the previous one.
    pub change_count: u32,
    pub min_value: u8,
    pub max_value: u8,
    pub last_value: u8,
    pub device_name: String,
}

impl CcActivity {
    fn first(channel: MidiChannel, cc_number: CCNumber, value: u8, device: &str) -> Self {
        Self {
            channel,
            cc_number,
            change_count: 0,
            min_value: value,
            max_value: value,
            last_value: value,
            device_name: device.to_string(),
        }
    }

    fn observe(&mut self, value: u8) {
        if value != self.last_value {
            self.change_count += 1;
        }
        self.min_value = self.min_value.min(value);
        self.max_value = self.max_value.max(value);
        self.last_value = value;
    }

    pub fn key(&self) -> CcKey {
        CcKey::exact(self.channel, self.cc_number)
    }
}

/// Mutable session state, guarded by the engine's session mutex.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) state: LearnState,
    pub(crate) request: Option<LearnRequest>,
    pub(crate) deadline: Option<Instant>,
    activity: BTreeMap<CcKey, CcActivity>,
}

impl Session {
    pub(crate) fn begin_learn(&mut self, request: LearnRequest, deadline: Instant) {
        self.state = LearnState::WaitingForCc;
        self.request = Some(request);
        self.deadline = Some(deadline);
    }

    pub(crate) fn begin_auto_learn(&mut self, deadline: Instant) {
        self.state = LearnState::Learning;
        self.request = None;
        self.deadline = Some(deadline);
        self.activity.clear();
    }

    /// Back to `Idle`. Returns the state that was left.
    pub(crate) fn reset(&mut self) -> LearnState {
        let previous = self.state;
        self.state = LearnState::Idle;
        self.request = None;
        self.deadline = None;
        previous
    }

    pub(crate) fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub(crate) fn record_activity(
        &mut self,
        channel: MidiChannel,
        cc_number: CCNumber,
        value: u8,
        device: &str,
    ) {
        self.activity
            .entry(CcKey::exact(channel, cc_number))
            .and_modify(|a| a.observe(value))
            .or_insert_with(|| CcActivity::first(channel, cc_number, value, device));
    }

    /// Ends auto-learn, returning controllers with at least `threshold` changes,
    /// busiest first.
    pub(crate) fn finish_auto_learn(&mut self, threshold: u32) -> Vec<CcActivity> {
        self.reset();
        let mut active: Vec<CcActivity> = std::mem::take(&mut self.activity)
            .into_values()
            .filter(|a| a.change_count >= threshold)
            .collect();
        active.sort_by(|a, b| b.change_count.cmp(&a.change_count));
        active
    }
}
