//! REST API endpoint handlers for the inspector server.
//!
//! All handlers take the read lock on the shared inspector, so each
//! response reflects one consistent point between two appends.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/session` | Current session and ingestion counters |
//! | `GET` | `/api/events` | Query log entries (by FSM, after a sequence id) |
//! | `GET` | `/api/events/count` | Number of events in the log |
//! | `GET` | `/api/fsm` | Names of FSMs seen this session |
//! | `GET` | `/api/fsm/{fsm}` | Active states and structure snapshots |
//! | `GET` | `/api/fsm/{fsm}/regions/{region}` | Active state of one region |
//! | `GET` | `/api/fsm/{fsm}/structures/{id}` | Latest snapshot of one structure |
//! | `GET`/`PUT` | `/api/fsm_info` | Opaque FSM description document |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use fsm_inspect_types::{DataStructureId, LogEntry, RegionId};
use serde_json::Value;

use crate::error::ObserverError;
use crate::state::AppState;

/// Default page size of `GET /api/events`.
const DEFAULT_EVENT_LIMIT: usize = 1000;

/// Largest page size of `GET /api/events`.
const MAX_EVENT_LIMIT: usize = 10_000;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/events` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Only events of this FSM.
    pub fsm: Option<String>,
    /// Only events with a sequence id greater than this.
    pub after: Option<u64>,
    /// Maximum number of events to return (default 1000, max 10000).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing session status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let inspector = state.inspector.read().await;
    let (session, status) = inspector.session().map_or_else(
        || (String::from("none"), "WAITING"),
        |info| {
            let status = if info.is_open() { "INGESTING" } else { "CLOSED" };
            (info.id.to_string(), status)
        },
    );
    let event_count = inspector.event_count();
    let fsm_count = inspector.fsm_names().count();
    let viewers = inspector.subscriber_count();
    let rejected = inspector.stats().messages_rejected;
    drop(inspector);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>FSM Inspector</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>FSM Inspector</h1>
    <p class="subtitle">Session {session}</p>

    <p>Status: <span class="status">{status}</span></p>

    <div>
        <div class="metric">
            <div class="label">Events</div>
            <div class="value">{event_count}</div>
        </div>
        <div class="metric">
            <div class="label">FSMs</div>
            <div class="value">{fsm_count}</div>
        </div>
        <div class="metric">
            <div class="label">Rejected</div>
            <div class="value">{rejected}</div>
        </div>
        <div class="metric">
            <div class="label">Viewers</div>
            <div class="value">{viewers}</div>
        </div>
    </div>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/session">/api/session</a> -- Session and ingestion counters</li>
        <li><a href="/api/events">/api/events</a> -- Log entries (?fsm=X&amp;after=N&amp;limit=N)</li>
        <li><a href="/api/events/count">/api/events/count</a> -- Event count</li>
        <li><a href="/api/fsm">/api/fsm</a> -- Known FSMs</li>
        <li><a href="/api/fsm_info">/api/fsm_info</a> -- FSM description</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/ingest</code> -- Producer input</li>
        <li><code>ws://host:port/ws/events</code> -- Log replay and live entries</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/session
// ---------------------------------------------------------------------------

/// Return the current session, its counters and the log size.
pub async fn get_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let inspector = state.inspector.read().await;
    Json(serde_json::json!({
        "session": inspector.session(),
        "stats": inspector.stats(),
        "event_count": inspector.event_count(),
        "subscribers": inspector.subscriber_count(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/events
// ---------------------------------------------------------------------------

/// Query log entries in append order.
///
/// # Query Parameters
///
/// - `fsm`: Only entries of this FSM.
/// - `after`: Only entries whose sequence id is greater than this.
/// - `limit`: Maximum number of entries (default 1000, max 10000).
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(MAX_EVENT_LIMIT);

    let inspector = state.inspector.read().await;
    let events: Vec<&LogEntry> = inspector
        .entries()
        .iter()
        .map(Arc::as_ref)
        .filter(|entry| {
            if let Some(fsm) = params.fsm.as_deref()
                && entry.event.fsm_name != fsm
            {
                return false;
            }
            if let Some(after) = params.after
                && entry.event.sequence_id <= after
            {
                return false;
            }
            true
        })
        .take(limit)
        .collect();

    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": serde_json::to_value(&events)?,
    })))
}

/// Return the number of events in the log.
pub async fn count_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = state.inspector.read().await.event_count();
    Json(serde_json::json!({ "count": count }))
}

// ---------------------------------------------------------------------------
// GET /api/fsm...
// ---------------------------------------------------------------------------

/// List the FSMs that produced at least one event.
pub async fn list_fsms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let inspector = state.inspector.read().await;
    let names: Vec<&str> = inspector.fsm_names().collect();
    Json(serde_json::json!({
        "count": names.len(),
        "fsms": names,
    }))
}

/// Return every active state and structure snapshot of one FSM.
///
/// Structures are keyed by their string form (`context`, `state_<name>`).
pub async fn get_fsm(
    State(state): State<Arc<AppState>>,
    Path(fsm): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let inspector = state.inspector.read().await;
    if !inspector.fsm_names().any(|name| name == fsm) {
        return Err(ObserverError::NotFound(format!("fsm {fsm}")));
    }

    let structures: BTreeMap<String, &Value> = inspector
        .structures(&fsm)
        .into_iter()
        .flatten()
        .map(|(id, value)| (id.to_string(), value))
        .collect();

    Ok(Json(serde_json::json!({
        "name": fsm,
        "regions": inspector.regions(&fsm),
        "structures": structures,
    })))
}

/// Return the active state of one region.
pub async fn get_region(
    State(state): State<Arc<AppState>>,
    Path((fsm, region)): Path<(String, RegionId)>,
) -> Result<impl IntoResponse, ObserverError> {
    let inspector = state.inspector.read().await;
    let active = inspector
        .active_state(&fsm, region)
        .ok_or_else(|| ObserverError::NotFound(format!("fsm {fsm} region {region}")))?;

    Ok(Json(serde_json::json!({
        "fsm": fsm,
        "region": region,
        "active_state": active,
    })))
}

/// Return the latest snapshot of one structure.
///
/// The id is the string form: `context` or `state_<name>`.
pub async fn get_structure(
    State(state): State<Arc<AppState>>,
    Path((fsm, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, ObserverError> {
    let id: DataStructureId = key
        .parse()
        .map_err(|e| ObserverError::InvalidQuery(format!("{key}: {e}")))?;

    let inspector = state.inspector.read().await;
    let value = inspector
        .structure_snapshot(&fsm, &id)
        .ok_or_else(|| ObserverError::NotFound(format!("fsm {fsm} structure {id}")))?;

    Ok(Json(serde_json::json!({
        "fsm": fsm,
        "id": id.to_string(),
        "value": value,
    })))
}

// ---------------------------------------------------------------------------
// GET/PUT /api/fsm_info
// ---------------------------------------------------------------------------

/// Return the stored FSM description document.
pub async fn get_fsm_info(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    state
        .fsm_info
        .read()
        .await
        .clone()
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound(String::from("fsm info")))
}

/// Replace the stored FSM description document.
pub async fn put_fsm_info(
    State(state): State<Arc<AppState>>,
    Json(info): Json<Value>,
) -> impl IntoResponse {
    *state.fsm_info.write().await = Some(info);
    StatusCode::NO_CONTENT
}
