//! Event ingestion and state derivation for the FSM inspector.
//!
//! Wire messages from an FSM runtime are decoded into typed events,
//! appended to an ordered log, multicast to live subscribers, and folded
//! into two derived indices: the active state of every region and the
//! latest snapshot of every data structure.
//!
//! # Modules
//!
//! - [`decode`] -- Wire message validation and decoding.
//! - [`log`] -- Append-only event log.
//! - [`fanout`] -- Multicast of appended entries and session starts.
//! - [`indices`] -- Active-state and snapshot indices.
//! - [`inspector`] -- [`Inspector`], the coordinator and query facade.
//! - [`session`] -- Driving one producer session from a frame stream.
//! - [`publish`] -- Producer-side [`Publisher`] building wire messages.
//! - [`config`] -- Configuration loading from `fsm-inspect.yaml`.

pub mod config;
pub mod decode;
pub mod fanout;
pub mod indices;
pub mod inspector;
pub mod log;
pub mod publish;
pub mod session;

pub use config::{ConfigError, InspectorConfig};
pub use decode::{DecodeError, DecodedMessage, MalformedStructure};
pub use fanout::{FeedEvent, SubscriberId, Subscription};
pub use indices::DerivedIndices;
pub use inspector::{
    FeedSnapshot, IngestStats, Inspector, SessionEnd, SessionId, SessionInfo, SessionStatus,
};
pub use publish::{Publisher, Transition};
pub use session::{SessionOutcome, SharedInspector, run_session};
