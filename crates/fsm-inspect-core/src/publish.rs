//! Producer side: turning runtime callbacks into wire messages.
//!
//! A [`Publisher`] lives next to the FSM runtime. It numbers every message
//! from 0 and only reports a data structure when its value differs from
//! the last one sent for the same FSM, so the inspector receives exactly
//! the snapshots it needs.

use std::collections::BTreeMap;

use fsm_inspect_types::{
    DataStructureId, ModifiedStructure, RegionId, StateEventKind, TransitionId, WireAction,
    WireCommon, WireEvent, WireMessage, WireProcessingEvent, WireStateEvent, WireTransition,
};
use serde_json::Value;

/// Builds numbered, de-duplicated wire messages.
#[derive(Debug, Default)]
pub struct Publisher {
    next_id: u64,
    last_sent: BTreeMap<String, BTreeMap<DataStructureId, Value>>,
}

impl Publisher {
    /// Create a publisher whose first message has id 0.
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            last_sent: BTreeMap::new(),
        }
    }

    /// Id the next message will carry.
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Wrap an event into a wire message.
    ///
    /// `structures` is the current value of every structure the callback
    /// can see. `null` values and values equal to the last one sent for the
    /// same FSM are left out of `modified_structures`.
    pub fn message(
        &mut self,
        fsm: &str,
        event: WireEvent,
        structures: impl IntoIterator<Item = ModifiedStructure>,
    ) -> WireMessage {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let sent = self.last_sent.entry(fsm.to_owned()).or_default();
        let modified_structures = structures
            .into_iter()
            .filter(|structure| !structure.value.is_null())
            .filter(|structure| {
                if sent.get(&structure.id) == Some(&structure.value) {
                    return false;
                }
                sent.insert(structure.id.clone(), structure.value.clone());
                true
            })
            .collect();

        WireMessage {
            common: WireCommon {
                id,
                fsm: fsm.to_owned(),
                modified_structures,
            },
            event,
        }
    }

    /// An event is about to be processed.
    pub fn processing_event(
        &mut self,
        fsm: &str,
        event_kind: &str,
        event_data: Value,
    ) -> WireMessage {
        let event = WireEvent::ProcessingEvent(WireProcessingEvent {
            event_kind: event_kind.to_owned(),
            event_data,
        });
        self.message(fsm, event, [])
    }

    /// A region is leaving `from` for `to`; reports the context.
    pub fn transition_started(
        &mut self,
        fsm: &str,
        transition: Transition<'_>,
        context: Value,
    ) -> WireMessage {
        let event = WireEvent::StateTransitionStart(transition.into_wire());
        self.message(fsm, event, [context_structure(context)])
    }

    /// A region has entered `to`; reports the context.
    pub fn transition_completed(
        &mut self,
        fsm: &str,
        transition: Transition<'_>,
        context: Value,
    ) -> WireMessage {
        let event = WireEvent::StateTransitioned(transition.into_wire());
        self.message(fsm, event, [context_structure(context)])
    }

    /// A state was entered or exited; reports the context and the state's data.
    pub fn state_event(
        &mut self,
        fsm: &str,
        transition_id: TransitionId,
        kind: StateEventKind,
        state_name: &str,
        context: Value,
        state: Value,
    ) -> WireMessage {
        let event = WireEvent::StateEvent(WireStateEvent {
            transition_id,
            state_event_kind: kind,
            state_name: state_name.to_owned(),
        });
        let structures = [
            context_structure(context),
            ModifiedStructure {
                id: DataStructureId::State(state_name.to_owned()),
                value: state,
            },
        ];
        self.message(fsm, event, structures)
    }

    /// A transition action ran; reports the context and the data of the
    /// states on both ends of the transition.
    pub fn action(
        &mut self,
        fsm: &str,
        transition_id: TransitionId,
        action_name: &str,
        context: Value,
        states: impl IntoIterator<Item = (String, Value)>,
    ) -> WireMessage {
        let event = WireEvent::Action(WireAction {
            transition_id,
            action_name: action_name.to_owned(),
        });
        let structures = std::iter::once(context_structure(context)).chain(
            states.into_iter().map(|(name, value)| ModifiedStructure {
                id: DataStructureId::State(name),
                value,
            }),
        );
        self.message(fsm, event, structures)
    }
}

/// Region transition as seen by a runtime callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<'a> {
    /// Transition-table entry or sentinel.
    pub transition_id: TransitionId,
    /// Region moving.
    pub region: RegionId,
    /// Source state name.
    pub from: &'a str,
    /// Target state name.
    pub to: &'a str,
}

impl Transition<'_> {
    fn into_wire(self) -> WireTransition {
        WireTransition {
            transition_id: self.transition_id,
            region_id: self.region,
            from: self.from.to_owned(),
            to: self.to.to_owned(),
        }
    }
}

const fn context_structure(value: Value) -> ModifiedStructure {
    ModifiedStructure {
        id: DataStructureId::Context,
        value,
    }
}
