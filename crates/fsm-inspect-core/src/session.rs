//! Driving one producer session from a stream of text frames.
//!
//! The transport is anything that yields `Result<String, E>`: the observer
//! feeds `WebSocket` text frames, tests feed a `futures::stream::iter`. Each
//! frame is ingested under the write lock, so frames are processed one at
//! a time in arrival order and readers never see a half-applied frame.

use std::fmt;
use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt as _};
use tokio::sync::RwLock;
use tracing::info;

use crate::inspector::{Inspector, SessionEnd, SessionId};

/// Inspector shared between the ingest loop and readers.
pub type SharedInspector = Arc<RwLock<Inspector>>;

/// Create an empty shared inspector.
pub fn shared() -> SharedInspector {
    Arc::new(RwLock::new(Inspector::new()))
}

/// How a session finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// The session that ran.
    pub id: SessionId,
    /// Why it ended.
    pub end: SessionEnd,
}

/// Run one session to completion.
///
/// Starts a fresh session, ingests every frame in order, and closes the
/// session when the stream ends (`StreamEnded`) or yields an error
/// (`Transport`). Undecodable frames are already logged and counted by the
/// inspector and do not end the session.
pub async fn run_session<S, E>(shared: &SharedInspector, frames: S) -> SessionOutcome
where
    S: Stream<Item = Result<String, E>>,
    E: fmt::Display,
{
    let id = shared.write().await.begin_session();
    info!(session = %id, "session started");

    let mut frames = pin!(frames);
    let end = loop {
        match frames.next().await {
            Some(Ok(text)) => {
                // Rejections are logged and counted by the inspector.
                let _ = shared.write().await.ingest_text(&text);
            }
            Some(Err(error)) => break SessionEnd::Transport(error.to_string()),
            None => break SessionEnd::StreamEnded,
        }
    };

    shared.write().await.end_session(end.clone());
    SessionOutcome { id, end }
}
