//! The inspector: single owner of the log, the fanout and the indices.
//!
//! [`Inspector::append`] is the only way anything enters the log. It
//! pushes the entry, publishes it, then folds it into the indices, so a
//! reader holding `&Inspector` always sees the three in agreement. Readers
//! get slices and borrowed values, never mutable access to the containers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fsm_inspect_types::{DataStructureId, Event, LogEntry, RegionId};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decode::{self, DecodeError, DecodedMessage};
use crate::fanout::{Fanout, FeedEvent, SubscriberId, Subscription};
use crate::indices::DerivedIndices;
use crate::log::EventLog;

/// Identifier of one producer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new time-ordered session id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SessionEnd {
    /// The producer closed the stream.
    StreamEnded,
    /// The transport failed.
    Transport(String),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamEnded => f.write_str("stream ended"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
        }
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Events are being ingested.
    Open,
    /// No more events will arrive; indices stay queryable.
    Closed {
        /// When the session ended.
        ended_at: DateTime<Utc>,
        /// Why it ended.
        reason: SessionEnd,
    },
}

/// Metadata of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    /// Session identifier.
    pub id: SessionId,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Whether it is still open.
    #[serde(flatten)]
    pub status: SessionStatus,
}

impl SessionInfo {
    /// Whether the session is still ingesting.
    pub const fn is_open(&self) -> bool {
        matches!(self.status, SessionStatus::Open)
    }
}

/// Ingestion counters for the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Messages handed to the inspector.
    pub messages_received: u64,
    /// Messages that became log entries.
    pub events_accepted: u64,
    /// Messages discarded because they did not decode.
    pub messages_rejected: u64,
    /// Individual `modified_structures` entries dropped.
    pub structures_dropped: u64,
}

/// Everything a new feed subscriber needs, taken atomically.
///
/// Entries appended after the snapshot arrive on `subscription`; entries in
/// `history` never do.
#[derive(Debug)]
pub struct FeedSnapshot {
    /// The session `history` belongs to, if one was ever started.
    pub session: Option<SessionId>,
    /// Every entry already in the log, in append order.
    pub history: Vec<Arc<LogEntry>>,
    /// Live deliveries from the moment of the snapshot.
    pub subscription: Subscription,
}

/// Event log, fanout and derived indices of one inspection session.
#[derive(Debug, Default)]
pub struct Inspector {
    session: Option<SessionInfo>,
    log: EventLog,
    indices: DerivedIndices,
    fanout: Fanout,
    stats: IngestStats,
}

impl Inspector {
    /// Create an inspector with an empty log and no session.
    pub const fn new() -> Self {
        Self {
            session: None,
            log: EventLog::new(),
            indices: DerivedIndices::new(),
            fanout: Fanout::new(),
            stats: IngestStats {
                messages_received: 0,
                events_accepted: 0,
                messages_rejected: 0,
                structures_dropped: 0,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Start a new session from empty state.
    ///
    /// The log, indices and counters are replaced. Subscribers stay
    /// registered; they receive [`FeedEvent::SessionStarted`] and then the
    /// new session's entries.
    pub fn begin_session(&mut self) -> SessionId {
        let id = SessionId::new();
        if let Some(previous) = &self.session {
            debug!(previous = %previous.id, events = self.log.len(), "discarding previous session");
        }
        self.session = Some(SessionInfo {
            id,
            started_at: Utc::now(),
            status: SessionStatus::Open,
        });
        self.log = EventLog::new();
        self.indices = DerivedIndices::new();
        self.stats = IngestStats::default();
        self.fanout.publish(&FeedEvent::SessionStarted(id));
        id
    }

    /// Mark the current session closed. Log and indices are kept.
    pub fn end_session(&mut self, reason: SessionEnd) {
        if let Some(session) = &mut self.session {
            info!(session = %session.id, %reason, events = self.log.len(), "session closed");
            session.status = SessionStatus::Closed {
                ended_at: Utc::now(),
                reason,
            };
        }
    }

    /// The current (or most recent) session.
    pub const fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    /// Whether a session is currently open.
    pub fn has_open_session(&self) -> bool {
        self.session.as_ref().is_some_and(SessionInfo::is_open)
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Decode and append one text frame.
    ///
    /// An undecodable frame is counted, logged and discarded; the log and
    /// indices are left untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] that caused the frame to be discarded.
    pub fn ingest_text(&mut self, text: &str) -> Result<Arc<LogEntry>, DecodeError> {
        let decoded = decode::decode_text(text);
        self.ingest_decoded(decoded)
    }

    /// Decode and append one message already parsed into JSON.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] that caused the message to be discarded.
    pub fn ingest_value(&mut self, message: &Value) -> Result<Arc<LogEntry>, DecodeError> {
        let decoded = decode::decode(message);
        self.ingest_decoded(decoded)
    }

    fn ingest_decoded(
        &mut self,
        decoded: Result<DecodedMessage, DecodeError>,
    ) -> Result<Arc<LogEntry>, DecodeError> {
        self.stats.messages_received = self.stats.messages_received.saturating_add(1);
        match decoded {
            Ok(message) => Ok(self.append(message)),
            Err(error) => {
                self.stats.messages_rejected = self.stats.messages_rejected.saturating_add(1);
                warn!(%error, "discarding undecodable message");
                Err(error)
            }
        }
    }

    /// Append a decoded message: log, then fanout, then indices.
    pub fn append(&mut self, message: DecodedMessage) -> Arc<LogEntry> {
        let DecodedMessage {
            event,
            modified_structures,
            malformed_structures,
        } = message;

        for malformed in &malformed_structures {
            warn!(
                fsm = %event.fsm_name,
                sequence_id = event.sequence_id,
                %malformed,
                "dropping modified structure"
            );
        }
        let dropped = u64::try_from(malformed_structures.len()).unwrap_or(u64::MAX);
        self.stats.structures_dropped = self.stats.structures_dropped.saturating_add(dropped);

        let entry = self.log.push(LogEntry {
            event,
            modified_structures,
            received_at: Utc::now(),
        });
        let delivered = self.fanout.publish(&FeedEvent::Entry(Arc::clone(&entry)));
        self.indices.apply(&entry.event, &entry.modified_structures);
        self.stats.events_accepted = self.stats.events_accepted.saturating_add(1);

        debug!(
            fsm = %entry.event.fsm_name,
            sequence_id = entry.event.sequence_id,
            kind = entry.event.kind.name(),
            structures = entry.modified_structures.len(),
            delivered,
            "event appended"
        );
        entry
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register for every event published from now on.
    pub fn subscribe(&mut self) -> Subscription {
        self.fanout.subscribe()
    }

    /// Copy the log and register a subscriber in one step.
    ///
    /// Since both happen under the same `&mut self`, every entry is either
    /// in the returned history or delivered on the subscription, never both.
    pub fn subscribe_with_history(&mut self) -> FeedSnapshot {
        let subscription = self.fanout.subscribe();
        FeedSnapshot {
            session: self.session.as_ref().map(|session| session.id),
            history: self.log.all().to_vec(),
            subscription,
        }
    }

    /// Stop deliveries to a subscriber.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.fanout.unsubscribe(id)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.fanout.subscriber_count()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Active state of a region, absent until its first completed transition.
    pub fn active_state(&self, fsm_name: &str, region: RegionId) -> Option<&str> {
        self.indices.active_state(fsm_name, region)
    }

    /// Latest snapshot of a structure, absent until its first modification.
    pub fn structure_snapshot(&self, fsm_name: &str, id: &DataStructureId) -> Option<&Value> {
        self.indices.structure_snapshot(fsm_name, id)
    }

    /// Number of events in the log.
    pub const fn event_count(&self) -> usize {
        self.log.len()
    }

    /// Every log entry, in append order.
    pub const fn entries(&self) -> &[Arc<LogEntry>] {
        self.log.all()
    }

    /// Every event, in append order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.log.events()
    }

    /// FSMs seen in this session.
    pub fn fsm_names(&self) -> impl Iterator<Item = &str> {
        self.indices.fsm_names()
    }

    /// Active state of every region of an FSM.
    pub fn regions(&self, fsm_name: &str) -> Option<&BTreeMap<RegionId, String>> {
        self.indices.regions(fsm_name)
    }

    /// Latest snapshot of every structure of an FSM.
    pub fn structures(&self, fsm_name: &str) -> Option<&BTreeMap<DataStructureId, Value>> {
        self.indices.structures(fsm_name)
    }

    /// The derived indices as currently applied.
    pub const fn indices(&self) -> &DerivedIndices {
        &self.indices
    }

    /// Ingestion counters of the current session.
    pub const fn stats(&self) -> IngestStats {
        self.stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn completed(id: u64, region: RegionId, to: &str) -> Value {
        json!({
            "common": {"id": id, "fsm": "Lights", "modified_structures": []},
            "event": {"StateTransitioned": {
                "transition_id": {"Table": 0}, "region_id": region, "from": "Off", "to": to
            }}
        })
    }

    #[test]
    fn count_and_order_follow_appends() {
        let mut inspector = Inspector::new();
        for id in 0..5 {
            inspector.ingest_value(&completed(id, 0, "On")).unwrap();
        }
        assert_eq!(inspector.event_count(), 5);
        let ids: Vec<u64> = inspector.events().map(|e| e.sequence_id).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn rejected_messages_leave_no_trace() {
        let mut inspector = Inspector::new();
        assert!(inspector.ingest_text("[]").is_err());
        assert!(inspector.ingest_text("not json").is_err());
        assert_eq!(inspector.event_count(), 0);
        assert_eq!(inspector.fsm_names().count(), 0);
        let stats = inspector.stats();
        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.messages_rejected, 2);
        assert_eq!(stats.events_accepted, 0);
    }

    #[test]
    fn dropped_structures_are_counted() {
        let mut inspector = Inspector::new();
        let message = json!({
            "common": {"id": 0, "fsm": "Lights", "modified_structures": [
                {"id": "Nope", "value": 1},
                {"id": "Context", "value": 2}
            ]},
            "event": {"ProcessingEvent": {"event_kind": "Tick", "event_data": null}}
        });
        let entry = inspector.ingest_value(&message).unwrap();
        assert_eq!(entry.modified_structures.len(), 1);
        assert_eq!(inspector.stats().structures_dropped, 1);
        assert_eq!(
            inspector.structure_snapshot("Lights", &DataStructureId::Context),
            Some(&json!(2))
        );
    }

    #[test]
    fn subscribers_receive_appended_entries() {
        let mut inspector = Inspector::new();
        let mut subscription = inspector.subscribe();
        inspector.ingest_value(&completed(0, 0, "On")).unwrap();
        let received = subscription.try_recv().unwrap();
        assert_eq!(received.entry().unwrap().event.sequence_id, 0);
        assert!(inspector.unsubscribe(subscription.id()));
        assert_eq!(inspector.subscriber_count(), 0);
    }

    #[test]
    fn new_session_starts_from_empty_state() {
        let mut inspector = Inspector::new();
        let first = inspector.begin_session();
        inspector.ingest_value(&completed(0, 0, "On")).unwrap();
        inspector.end_session(SessionEnd::StreamEnded);
        assert!(!inspector.has_open_session());
        assert_eq!(inspector.active_state("Lights", 0), Some("On"));

        let second = inspector.begin_session();
        assert_ne!(first, second);
        assert!(inspector.has_open_session());
        assert_eq!(inspector.event_count(), 0);
        assert_eq!(inspector.active_state("Lights", 0), None);
        assert_eq!(inspector.stats(), IngestStats::default());
    }

    #[test]
    fn indices_match_replay_of_log() {
        let mut inspector = Inspector::new();
        inspector.ingest_value(&completed(0, 0, "On")).unwrap();
        inspector.ingest_value(&completed(1, 1, "Blink")).unwrap();
        inspector.ingest_value(&completed(2, 0, "Off")).unwrap();
        let replayed = DerivedIndices::replay(inspector.entries().iter().map(AsRef::as_ref));
        assert_eq!(&replayed, inspector.indices());
    }

    #[test]
    fn subscribers_see_session_boundaries() {
        let mut inspector = Inspector::new();
        let mut subscription = inspector.subscribe();

        let first = inspector.begin_session();
        inspector.ingest_value(&completed(0, 0, "On")).unwrap();
        let second = inspector.begin_session();
        inspector.ingest_value(&completed(0, 0, "Off")).unwrap();

        let mut feed = Vec::new();
        while let Some(event) = subscription.try_recv() {
            feed.push(event);
        }
        assert_eq!(feed.len(), 4);
        assert_eq!(feed[0], FeedEvent::SessionStarted(first));
        assert_eq!(feed[1].entry().unwrap().event.sequence_id, 0);
        assert_eq!(feed[2], FeedEvent::SessionStarted(second));
        assert_eq!(feed[3].entry().unwrap().event.sequence_id, 0);
        assert_ne!(first, second);
    }

    #[test]
    fn history_and_subscription_deliver_each_entry_once() {
        let mut inspector = Inspector::new();
        let session = inspector.begin_session();
        for id in 0..3 {
            inspector.ingest_value(&completed(id, 0, "On")).unwrap();
        }

        let FeedSnapshot {
            session: snapshot_session,
            history,
            mut subscription,
        } = inspector.subscribe_with_history();
        for id in 3..5 {
            inspector.ingest_value(&completed(id, 0, "On")).unwrap();
        }

        assert_eq!(snapshot_session, Some(session));
        let mut seen: Vec<u64> = history.iter().map(|e| e.event.sequence_id).collect();
        while let Some(event) = subscription.try_recv() {
            seen.push(event.entry().unwrap().event.sequence_id);
        }
        assert_eq!(seen, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn snapshot_without_session_is_empty() {
        let mut inspector = Inspector::new();
        let snapshot = inspector.subscribe_with_history();
        assert_eq!(snapshot.session, None);
        assert!(snapshot.history.is_empty());
        assert_eq!(inspector.subscriber_count(), 1);
    }
}
