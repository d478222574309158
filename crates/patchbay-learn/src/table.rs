//! Mapping table with a reverse index by parameter.
//!
//! Each `(channel, cc)` key holds at most one mapping and each parameter is
//! bound to at most one key; `by_parameter` is always the inverse of the
//! `by_cc` projection onto `parameter_id`.

use crate::mapping::{CCMapping, CCNumber, CcKey, MidiChannel};
use std::collections::{BTreeMap, HashMap};

/// What an insert displaced.
#[derive(Debug, Default)]
pub(crate) struct InsertOutcome {
    /// Previous mapping of the same parameter (possibly on another controller).
    pub(crate) replaced: Option<CCMapping>,
    /// Mapping of a different parameter that occupied the same controller.
    pub(crate) conflict: Option<CCMapping>,
}

#[derive(Debug, Default, Clone)]
pub struct MappingTable {
    by_cc: BTreeMap<CcKey, CCMapping>,
    by_parameter: HashMap<String, CcKey>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, mapping: CCMapping) -> InsertOutcome {
        let key = mapping.key();
        let mut outcome = InsertOutcome {
            replaced: self.remove_parameter(&mapping.parameter_id),
            conflict: None,
        };

        if let Some(occupant) = self.by_cc.remove(&key) {
            self.by_parameter.remove(&occupant.parameter_id);
            outcome.conflict = Some(occupant);
        }

        self.by_parameter.insert(mapping.parameter_id.clone(), key);
        self.by_cc.insert(key, mapping);
        outcome
    }

    pub fn remove_parameter(&mut self, parameter_id: &str) -> Option<CCMapping> {
        let key = self.by_parameter.remove(parameter_id)?;
        self.by_cc.remove(&key)
    }

    pub fn remove_key(&mut self, key: CcKey) -> Option<CCMapping> {
        let mapping = self.by_cc.remove(&key)?;
        self.by_parameter.remove(&mapping.parameter_id);
        Some(mapping)
    }

    /// Exact channel first, then the any-channel entry. Inactive mappings
    /// are returned too; callers decide whether to route them.
    pub fn lookup(&self, channel: MidiChannel, cc_number: CCNumber) -> Option<&CCMapping> {
        self.by_cc
            .get(&CcKey::exact(channel, cc_number))
            .or_else(|| self.by_cc.get(&CcKey::any_channel(cc_number)))
    }

    pub fn get(&self, key: &CcKey) -> Option<&CCMapping> {
        self.by_cc.get(key)
    }

    pub fn get_mut(&mut self, key: &CcKey) -> Option<&mut CCMapping> {
        self.by_cc.get_mut(key)
    }

    pub fn key_for_parameter(&self, parameter_id: &str) -> Option<CcKey> {
        self.by_parameter.get(parameter_id).copied()
    }

    pub fn get_parameter(&self, parameter_id: &str) -> Option<&CCMapping> {
        self.key_for_parameter(parameter_id)
            .and_then(|key| self.by_cc.get(&key))
    }

    pub fn contains_parameter(&self, parameter_id: &str) -> bool {
        self.by_parameter.contains_key(parameter_id)
    }

    /// Mappings in key order.
    pub fn iter(&self) -> impl Iterator<Item = &CCMapping> {
        self.by_cc.values()
    }

    pub fn len(&self) -> usize {
        self.by_cc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cc.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_cc.clear();
        self.by_parameter.clear();
    }

    /// True when the reverse index is an exact inverse of the forward table.
    pub fn is_consistent(&self) -> bool {
        self.by_cc.len() == self.by_parameter.len()
            && self.by_cc.iter().all(|(key, mapping)| {
                mapping.key() == *key && self.by_parameter.get(&mapping.parameter_id) == Some(key)
            })
    }
}
