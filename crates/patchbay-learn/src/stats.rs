//! CC traffic statistics.

use crate::mapping::{CCNumber, CcKey, MidiChannel};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Snapshot of engine statistics.
#[derive(Debug, Clone, Default)]
pub struct LearnStatistics {
    pub total_messages: u64,
    /// Messages routed to a parameter.
    pub mapped_messages: u64,
    /// Mappings created by learn sessions.
    pub learned_mappings: u64,
    pub cc_usage: BTreeMap<CcKey, u64>,
    pub last_activity: Option<Instant>,
    pub mapping_count: usize,
}

impl LearnStatistics {
    /// The `n` busiest controllers, busiest first.
    pub fn most_used(&self, n: usize) -> Vec<(CcKey, u64)> {
        let mut usage: Vec<(CcKey, u64)> = self.cc_usage.iter().map(|(k, v)| (*k, *v)).collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        usage.truncate(n);
        usage
    }
}

/// Counters plus the last value seen per controller.
#[derive(Debug, Default)]
pub(crate) struct StatsState {
    pub(crate) stats: LearnStatistics,
    last_values: HashMap<(MidiChannel, CCNumber), u8>,
}

impl StatsState {
    /// Records a message and returns the previous value for the controller.
    pub(crate) fn observe(
        &mut self,
        channel: MidiChannel,
        cc_number: CCNumber,
        value: u8,
        now: Instant,
    ) -> Option<u8> {
        self.stats.total_messages += 1;
        *self
            .stats
            .cc_usage
            .entry(CcKey::exact(channel, cc_number))
            .or_insert(0) += 1;
        self.stats.last_activity = Some(now);
        self.last_values.insert((channel, cc_number), value)
    }

    pub(crate) fn reset(&mut self) {
        self.stats = LearnStatistics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_returns_previous() {
        let mut state = StatsState::default();
        let now = Instant::now();
        assert_eq!(state.observe(0, 1, 10, now), None);
        assert_eq!(state.observe(0, 1, 20, now), Some(10));
        assert_eq!(state.observe(1, 1, 5, now), None);
        assert_eq!(state.stats.total_messages, 3);
        assert_eq!(state.stats.cc_usage[&CcKey::exact(0, 1)], 2);
    }

    #[test]
    fn test_most_used() {
        let mut state = StatsState::default();
        let now = Instant::now();
        for _ in 0..3 {
            state.observe(0, 7, 1, now);
        }
        state.observe(0, 1, 1, now);
        for _ in 0..2 {
            state.observe(0, 74, 1, now);
        }

        let top = state.stats.most_used(2);
        assert_eq!(top, vec![(CcKey::exact(0, 7), 3), (CcKey::exact(0, 74), 2)]);
    }

    #[test]
    fn test_reset_keeps_last_values() {
        let mut state = StatsState::default();
        let now = Instant::now();
        state.observe(0, 1, 42, now);
        state.reset();
        assert_eq!(state.stats.total_messages, 0);
        assert_eq!(state.observe(0, 1, 50, now), Some(42));
    }
}
