//! Wire shapes of the messages an FSM runtime emits.
//!
//! A message is `{ "common": {...}, "event": { "<Tag>": {...} } }` where
//! the event section carries exactly one of the [`WireEventTag`] keys.
//! These types serialize to that shape as-is; decoding of untrusted input
//! goes through the core decoder, which picks the tag explicitly.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{
    DispatchedEvent, EventKind, ExecutedAction, ModifiedStructure, RegionTransition, StateChange,
    StateEventKind,
};
use crate::ids::{RegionId, TransitionId};

/// A complete wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Fields shared by every message.
    pub common: WireCommon,
    /// The single-key tagged event section.
    pub event: WireEvent,
}

/// The `common` section of a wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCommon {
    /// Sequence id, unique across the stream.
    pub id: u64,
    /// Name of the emitting FSM.
    pub fsm: String,
    /// Structures whose value changed with this event.
    #[serde(default)]
    pub modified_structures: Vec<ModifiedStructure>,
}

/// The `event` section of a wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireEvent {
    /// A region transition started.
    StateTransitionStart(WireTransition),
    /// A region transition finished.
    StateTransitioned(WireTransition),
    /// An event is being processed.
    ProcessingEvent(WireProcessingEvent),
    /// A state was entered or exited.
    StateEvent(WireStateEvent),
    /// A transition action ran.
    Action(WireAction),
}

impl WireEvent {
    /// The key this event is tagged with on the wire.
    pub const fn tag(&self) -> WireEventTag {
        match self {
            Self::StateTransitionStart(_) => WireEventTag::StateTransitionStart,
            Self::StateTransitioned(_) => WireEventTag::StateTransitioned,
            Self::ProcessingEvent(_) => WireEventTag::ProcessingEvent,
            Self::StateEvent(_) => WireEventTag::StateEvent,
            Self::Action(_) => WireEventTag::Action,
        }
    }
}

/// The key that selects a [`WireEvent`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireEventTag {
    /// `StateTransitionStart`
    StateTransitionStart,
    /// `StateTransitioned`
    StateTransitioned,
    /// `ProcessingEvent`
    ProcessingEvent,
    /// `StateEvent`
    StateEvent,
    /// `Action`
    Action,
}

impl WireEventTag {
    /// Every tag, in the order the decoder checks them.
    pub const ALL: [Self; 5] = [
        Self::StateTransitionStart,
        Self::StateTransitioned,
        Self::ProcessingEvent,
        Self::StateEvent,
        Self::Action,
    ];

    /// The object key of this tag.
    pub const fn key(self) -> &'static str {
        match self {
            Self::StateTransitionStart => "StateTransitionStart",
            Self::StateTransitioned => "StateTransitioned",
            Self::ProcessingEvent => "ProcessingEvent",
            Self::StateEvent => "StateEvent",
            Self::Action => "Action",
        }
    }
}

impl fmt::Display for WireEventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Body of `StateTransitionStart` and `StateTransitioned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransition {
    /// The transition being taken.
    pub transition_id: TransitionId,
    /// The region that transitions.
    pub region_id: RegionId,
    /// Source state name.
    pub from: String,
    /// Target state name.
    pub to: String,
}

/// Body of `ProcessingEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireProcessingEvent {
    /// Name of the event type.
    pub event_kind: String,
    /// The event as serialized by the producer.
    #[serde(default)]
    pub event_data: Value,
}

/// Body of `StateEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireStateEvent {
    /// The transition during which the state changed.
    pub transition_id: TransitionId,
    /// `Enter`, `Exit`, or a newer kind.
    pub state_event_kind: StateEventKind,
    /// The state concerned.
    pub state_name: String,
}

/// Body of `Action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAction {
    /// The transition the action belongs to.
    pub transition_id: TransitionId,
    /// Name of the action.
    pub action_name: String,
}

impl From<WireEvent> for EventKind {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::StateTransitionStart(t) => Self::TransitionStarted(t.into()),
            WireEvent::StateTransitioned(t) => Self::TransitionCompleted(t.into()),
            WireEvent::ProcessingEvent(p) => Self::EventDispatched(DispatchedEvent {
                event_kind: p.event_kind,
                event_payload: p.event_data,
            }),
            WireEvent::StateEvent(s) => Self::RegionStateChanged(StateChange {
                transition_id: s.transition_id,
                state_event_kind: s.state_event_kind,
                state_name: s.state_name,
            }),
            WireEvent::Action(a) => Self::ActionExecuted(ExecutedAction {
                transition_id: a.transition_id,
                action_name: a.action_name,
            }),
        }
    }
}

impl From<WireTransition> for RegionTransition {
    fn from(t: WireTransition) -> Self {
        Self {
            region: t.region_id,
            from_state: t.from,
            to_state: t.to,
            transition_id: t.transition_id,
        }
    }
}
