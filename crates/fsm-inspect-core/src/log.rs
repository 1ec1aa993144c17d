//! Append-only event log.
//!
//! Entries are stored behind [`Arc`] so the same record can be handed to
//! fanout subscribers and read through [`EventLog::all`] without copying.
//! Nothing is ever removed or reordered during a session.

use std::sync::Arc;

use fsm_inspect_types::{Event, LogEntry};
use tracing::warn;

/// Ordered log of every event accepted in the current session.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<Arc<LogEntry>>,
}

impl EventLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry in arrival order and return the shared handle.
    ///
    /// Arrival order is trusted. A sequence id that does not increase is
    /// logged but the entry is still appended.
    pub fn push(&mut self, entry: LogEntry) -> Arc<LogEntry> {
        if let Some(last) = self.last_sequence_id() {
            if entry.event.sequence_id <= last {
                warn!(
                    previous = last,
                    sequence_id = entry.event.sequence_id,
                    fsm = %entry.event.fsm_name,
                    "sequence id did not increase"
                );
            }
        }
        let entry = Arc::new(entry);
        self.entries.push(Arc::clone(&entry));
        entry
    }

    /// Every entry, in append order.
    pub const fn all(&self) -> &[Arc<LogEntry>] {
        self.entries.as_slice()
    }

    /// Every event, in append order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter().map(|entry| &entry.event)
    }

    /// Number of entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence id of the newest entry.
    pub fn last_sequence_id(&self) -> Option<u64> {
        self.entries.last().map(|entry| entry.event.sequence_id)
    }
}
