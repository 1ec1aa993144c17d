//! The typed inspection event model.
//!
//! An [`Event`] is what the inspector keeps in its log after a wire
//! message has been decoded. The structure snapshots that travel with a
//! message are not events themselves; they are kept next to the event in
//! a [`LogEntry`].

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::ids::{DataStructureId, RegionId, TransitionId};

/// A single lifecycle event reported by an FSM runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Producer-assigned id, increasing across the whole stream.
    pub sequence_id: u64,
    /// The FSM instance this event belongs to.
    pub fsm_name: String,
    /// Variant-specific payload.
    pub kind: EventKind,
}

impl Event {
    /// The transition that caused this event, if the variant carries one.
    pub const fn transition_id(&self) -> Option<TransitionId> {
        match &self.kind {
            EventKind::TransitionStarted(t) | EventKind::TransitionCompleted(t) => {
                Some(t.transition_id)
            }
            EventKind::RegionStateChanged(s) => Some(s.transition_id),
            EventKind::ActionExecuted(a) => Some(a.transition_id),
            EventKind::EventDispatched(_) => None,
        }
    }
}

/// The closed set of event variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A region began moving between states.
    TransitionStarted(RegionTransition),
    /// A region finished moving between states.
    TransitionCompleted(RegionTransition),
    /// The FSM started processing an event.
    EventDispatched(DispatchedEvent),
    /// A state was entered or exited.
    RegionStateChanged(StateChange),
    /// A transition action ran.
    ActionExecuted(ExecutedAction),
}

impl EventKind {
    /// Short variant name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TransitionStarted(_) => "TransitionStarted",
            Self::TransitionCompleted(_) => "TransitionCompleted",
            Self::EventDispatched(_) => "EventDispatched",
            Self::RegionStateChanged(_) => "RegionStateChanged",
            Self::ActionExecuted(_) => "ActionExecuted",
        }
    }
}

/// Payload of a started or completed region transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RegionTransition {
    /// The region that transitions.
    pub region: RegionId,
    /// State the region leaves.
    pub from_state: String,
    /// State the region enters.
    pub to_state: String,
    /// The transition being taken.
    #[ts(type = "{ Table: number } | { Start: null } | { Stop: null }")]
    pub transition_id: TransitionId,
}

/// Payload of an event handed to the FSM for processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DispatchedEvent {
    /// Name of the event type.
    pub event_kind: String,
    /// The event as serialized by the producer.
    pub event_payload: Value,
}

/// Payload of a state entry or exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateChange {
    /// The transition during which the state changed.
    #[ts(type = "{ Table: number } | { Start: null } | { Stop: null }")]
    pub transition_id: TransitionId,
    /// Whether the state was entered or exited.
    #[ts(type = "string")]
    pub state_event_kind: StateEventKind,
    /// The state concerned.
    pub state_name: String,
}

/// Payload of an executed transition action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExecutedAction {
    /// The transition the action belongs to.
    #[ts(type = "{ Table: number } | { Start: null } | { Stop: null }")]
    pub transition_id: TransitionId,
    /// Name of the action.
    pub action_name: String,
}

/// Kind of a state lifecycle event.
///
/// The producer may grow new kinds; anything other than `Enter` or `Exit`
/// is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StateEventKind {
    /// The state was entered.
    Enter,
    /// The state was exited.
    Exit,
    /// A kind this inspector does not know about.
    Other(String),
}

impl From<String> for StateEventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "Enter" => Self::Enter,
            "Exit" => Self::Exit,
            _ => Self::Other(kind),
        }
    }
}

impl From<StateEventKind> for String {
    fn from(kind: StateEventKind) -> Self {
        match kind {
            StateEventKind::Enter => Self::from("Enter"),
            StateEventKind::Exit => Self::from("Exit"),
            StateEventKind::Other(other) => other,
        }
    }
}

impl fmt::Display for StateEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("Enter"),
            Self::Exit => f.write_str("Exit"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// Point-in-time value of one data structure, attached to the message
/// whose event changed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ModifiedStructure {
    /// Which structure changed.
    pub id: DataStructureId,
    /// Its new value.
    pub value: Value,
}

/// One record of the inspector's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// The decoded event.
    pub event: Event,
    /// Structure snapshots that arrived with the event.
    pub modified_structures: Vec<ModifiedStructure>,
    /// Local time the message was ingested.
    pub received_at: DateTime<Utc>,
}
