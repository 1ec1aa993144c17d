//! Shared type definitions for the FSM inspector.
//!
//! This crate is the single source of truth for the event model used
//! across the workspace. Types flow downstream to `TypeScript` via `ts-rs`
//! for the inspector views.
//!
//! # Modules
//!
//! - [`ids`] -- Transition and data-structure identifiers
//! - [`event`] -- The typed event model and log entries
//! - [`wire`] -- Wire message shapes emitted by FSM runtimes

pub mod event;
pub mod ids;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use event::{
    DispatchedEvent, Event, EventKind, ExecutedAction, LogEntry, ModifiedStructure,
    RegionTransition, StateChange, StateEventKind,
};
pub use ids::{DataStructureId, IdError, RegionId, TRANSITION_ID_KEYS, TransitionId};
pub use wire::{
    WireAction, WireCommon, WireEvent, WireEventTag, WireMessage, WireProcessingEvent,
    WireStateEvent, WireTransition,
};
