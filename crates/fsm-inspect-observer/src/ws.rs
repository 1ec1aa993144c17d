//! `WebSocket` feed of log entries for inspector views.
//!
//! Clients connect to `GET /ws/events` and receive one JSON frame per text
//! message, tagged by `type`:
//!
//! - `session_started` carries the new `session` id. It is sent first when
//!   a session exists at connect time and again whenever a producer starts
//!   a new one. Everything received before it belongs to an older session.
//! - `entry` carries one [`LogEntry`] and the `session` it was logged in.
//!
//! History is replayed before live entries. The history copy and the
//! subscription come from [`Inspector::subscribe_with_history`], so no
//! entry is missed or sent twice.
//!
//! [`Inspector::subscribe_with_history`]: fsm_inspect_core::Inspector::subscribe_with_history

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use fsm_inspect_core::{FeedEvent, FeedSnapshot, SessionId};
use fsm_inspect_types::LogEntry;
use serde::Serialize;
use tracing::{debug, warn};

use crate::state::AppState;

/// One frame of the view feed.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeedFrame<'a> {
    SessionStarted {
        session: SessionId,
    },
    Entry {
        session: Option<SessionId>,
        entry: &'a LogEntry,
    },
}

impl FeedFrame<'_> {
    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                warn!("Failed to serialize feed frame: {e}");
                None
            }
        }
    }
}

/// Tracks which session the frames of one connection belong to.
#[derive(Debug)]
struct FeedCursor {
    session: Option<SessionId>,
}

impl FeedCursor {
    /// Frames replaying a snapshot, boundary first.
    fn replay(snapshot: &FeedSnapshot) -> (Self, Vec<Message>) {
        let cursor = Self {
            session: snapshot.session,
        };
        let boundary = snapshot
            .session
            .and_then(|session| FeedFrame::SessionStarted { session }.to_message());
        let frames = boundary
            .into_iter()
            .chain(snapshot.history.iter().filter_map(|entry| cursor.entry_frame(entry)))
            .collect();
        (cursor, frames)
    }

    /// The frame for a live delivery.
    fn frame(&mut self, event: &FeedEvent) -> Option<Message> {
        match event {
            FeedEvent::SessionStarted(session) => {
                self.session = Some(*session);
                FeedFrame::SessionStarted { session: *session }.to_message()
            }
            FeedEvent::Entry(entry) => self.entry_frame(entry),
        }
    }

    fn entry_frame(&self, entry: &LogEntry) -> Option<Message> {
        FeedFrame::Entry {
            session: self.session,
            entry,
        }
        .to_message()
    }
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming log entries.
///
/// # Route
///
/// `GET /ws/events`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: replay history, then forward each
/// feed event until the client leaves.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let snapshot = state.inspector.write().await.subscribe_with_history();
    let (mut cursor, history) = FeedCursor::replay(&snapshot);
    let FeedSnapshot {
        mut subscription, ..
    } = snapshot;
    let id = subscription.id();
    debug!(subscriber = %id, history = history.len(), "view connected");

    let mut connected = true;
    for frame in history {
        if socket.send(frame).await.is_err() {
            connected = false;
            break;
        }
    }

    while connected {
        tokio::select! {
            // Receive a session start or a newly appended entry.
            event = subscription.recv() => {
                let Some(event) = event else {
                    break;
                };
                if let Some(frame) = cursor.frame(&event)
                    && socket.send(frame).await.is_err()
                {
                    debug!(subscriber = %id, "view disconnected (send failed)");
                    break;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(subscriber = %id, "view disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(subscriber = %id, "view disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(subscriber = %id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Views never send data.
                    }
                }
            }
        }
    }

    state.inspector.write().await.unsubscribe(id);
}
