//! Derived state indices kept in lockstep with the event log.
//!
//! Two maps are maintained: the active state of every `(fsm, region)`
//! pair and the latest snapshot of every `(fsm, structure)` pair. Both are
//! pure functions of the log prefix applied so far, so
//! [`DerivedIndices::replay`] over a log reproduces exactly what incremental
//! ingestion built.

use std::collections::{BTreeMap, BTreeSet};

use fsm_inspect_types::{
    DataStructureId, Event, EventKind, LogEntry, ModifiedStructure, RegionId,
};
use serde_json::Value;

/// Active-state and snapshot indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedIndices {
    fsm_names: BTreeSet<String>,
    active_states: BTreeMap<String, BTreeMap<RegionId, String>>,
    snapshots: BTreeMap<String, BTreeMap<DataStructureId, Value>>,
}

impl DerivedIndices {
    /// Create empty indices.
    pub const fn new() -> Self {
        Self {
            fsm_names: BTreeSet::new(),
            active_states: BTreeMap::new(),
            snapshots: BTreeMap::new(),
        }
    }

    /// Rebuild indices from empty state by applying every entry in order.
    pub fn replay<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        let mut indices = Self::new();
        for entry in entries {
            indices.apply(&entry.event, &entry.modified_structures);
        }
        indices
    }

    /// Fold one event and its structure snapshots into the indices.
    ///
    /// Only a completed transition moves the active state of its region;
    /// a started one is not visible here. Structure snapshots are written
    /// for every variant, last write wins.
    pub fn apply(&mut self, event: &Event, modified_structures: &[ModifiedStructure]) {
        if !self.fsm_names.contains(&event.fsm_name) {
            self.fsm_names.insert(event.fsm_name.clone());
        }

        if let EventKind::TransitionCompleted(transition) = &event.kind {
            self.active_states
                .entry(event.fsm_name.clone())
                .or_default()
                .insert(transition.region, transition.to_state.clone());
        }

        if modified_structures.is_empty() {
            return;
        }
        let snapshots = self.snapshots.entry(event.fsm_name.clone()).or_default();
        for structure in modified_structures {
            snapshots.insert(structure.id.clone(), structure.value.clone());
        }
    }

    /// State the region entered with its latest completed transition.
    pub fn active_state(&self, fsm_name: &str, region: RegionId) -> Option<&str> {
        self.active_states
            .get(fsm_name)
            .and_then(|regions| regions.get(&region))
            .map(String::as_str)
    }

    /// Latest value of a structure.
    pub fn structure_snapshot(&self, fsm_name: &str, id: &DataStructureId) -> Option<&Value> {
        self.snapshots.get(fsm_name).and_then(|structures| structures.get(id))
    }

    /// Active state of every region of an FSM that has completed a transition.
    pub fn regions(&self, fsm_name: &str) -> Option<&BTreeMap<RegionId, String>> {
        self.active_states.get(fsm_name)
    }

    /// Latest value of every structure of an FSM.
    pub fn structures(&self, fsm_name: &str) -> Option<&BTreeMap<DataStructureId, Value>> {
        self.snapshots.get(fsm_name)
    }

    /// Every FSM that has produced at least one event.
    pub fn fsm_names(&self) -> impl Iterator<Item = &str> {
        self.fsm_names.iter().map(String::as_str)
    }
}
