//! Producer `WebSocket` endpoint.
//!
//! An FSM runtime connects to `GET /ws/ingest` and sends one wire message
//! per text frame. The socket is adapted into a frame stream and handed to
//! [`run_session`], which owns the session from open to close. Only one
//! producer may be connected at a time.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use fsm_inspect_core::run_session;
use futures::{Stream, StreamExt as _, future};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, info, warn};

use crate::error::ObserverError;
use crate::state::AppState;

/// Upgrade a producer connection and start a new session.
///
/// # Route
///
/// `GET /ws/ingest`
///
/// # Errors
///
/// Returns [`ObserverError::Conflict`] (409) while another producer is
/// connected. The slot is checked before the upgrade headers, so a busy
/// inspector answers 409 to any request on this route.
pub async fn ws_ingest(
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ObserverError> {
    let Some(permit) = state.claim_producer() else {
        warn!("refusing second producer connection");
        return Err(ObserverError::Conflict(String::from(
            "a producer session is already open",
        )));
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let limit = state.ingest.max_frame_bytes;
    Ok(ws
        .max_frame_size(limit)
        .max_message_size(limit)
        .on_upgrade(move |socket| handle_producer(socket, state, permit))
        .into_response())
}

/// Adapt producer socket messages into the text frames of a session.
///
/// Text frames pass through, binary frames are logged and skipped, control
/// frames are skipped, and transport errors are forwarded so the session
/// can record them.
fn producer_frames<S, E>(messages: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<Message, E>>,
{
    messages.filter_map(|message| {
        future::ready(match message {
            Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
            Ok(Message::Binary(bytes)) => {
                warn!(len = bytes.len(), "ignoring binary frame from producer");
                None
            }
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    })
}

/// Feed every text frame of the socket into a session until it closes.
async fn handle_producer(socket: WebSocket, state: Arc<AppState>, permit: OwnedSemaphorePermit) {
    debug!("producer connected");
    let outcome = run_session(&state.inspector, producer_frames(socket)).await;
    info!(session = %outcome.id, end = %outcome.end, "producer disconnected");
    drop(permit);
}
