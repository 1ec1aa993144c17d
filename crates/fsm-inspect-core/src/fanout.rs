//! Multicast delivery of newly appended log entries and session boundaries.
//!
//! Each subscriber owns an unbounded channel, so publishing never blocks
//! and a slow subscriber never loses entries. Subscribers only see events
//! published after they registered; history has to be read from the log.
//! A [`FeedEvent::SessionStarted`] precedes the entries of every new
//! session, so a subscriber that outlives a session knows to drop what it
//! built from the previous one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fsm_inspect_types::LogEntry;
use tokio::sync::mpsc;
use tracing::debug;

use crate::inspector::SessionId;

/// One delivery to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A new session started; everything delivered before belongs to an
    /// earlier session.
    SessionStarted(SessionId),
    /// An entry was appended to the current session's log.
    Entry(Arc<LogEntry>),
}

impl FeedEvent {
    /// The entry, if this is one.
    pub const fn entry(&self) -> Option<&Arc<LogEntry>> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::SessionStarted(_) => None,
        }
    }
}

/// Handle identifying one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a subscription.
///
/// Dropping it is equivalent to unsubscribing; the fanout prunes it on
/// the next publish.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<FeedEvent>,
}

impl Subscription {
    /// This subscription's id, for [`Fanout::unsubscribe`].
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the subscription has been removed and every
    /// event delivered before removal has been received.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already waiting.
    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.rx.try_recv().ok()
    }
}

/// Registry of live subscribers.
#[derive(Debug, Default)]
pub struct Fanout {
    next_id: u64,
    subscribers: BTreeMap<SubscriberId, mpsc::UnboundedSender<FeedEvent>>,
}

impl Fanout {
    /// Create a fanout with no subscribers.
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: BTreeMap::new(),
        }
    }

    /// Register a subscriber for every event published from now on.
    pub fn subscribe(&mut self) -> Subscription {
        let id = SubscriberId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(id, tx);
        debug!(subscriber = %id, "subscriber registered");
        Subscription { id, rx }
    }

    /// Stop future deliveries to a subscriber.
    ///
    /// Entries already delivered stay readable from its [`Subscription`].
    /// Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    /// Deliver an event to every subscriber, in registration order.
    ///
    /// Subscribers whose receiving end is gone are pruned. Returns the
    /// number of subscribers the event was delivered to.
    pub fn publish(&mut self, event: &FeedEvent) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        let delivered = self.subscribers.len();
        if delivered < before {
            debug!(
                pruned = before.saturating_sub(delivered),
                "dropped closed subscribers"
            );
        }
        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
