//! Axum router construction for the inspector API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin view access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::ingest;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the inspector server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/ingest` -- producer `WebSocket`
/// - `GET /ws/events` -- log replay and live entries for views
/// - `GET /api/session` -- session and counters
/// - `GET /api/events` -- query log entries
/// - `GET /api/events/count` -- event count
/// - `GET /api/fsm` -- known FSMs
/// - `GET /api/fsm/{fsm}` -- FSM overview
/// - `GET /api/fsm/{fsm}/regions/{region}` -- active state
/// - `GET /api/fsm/{fsm}/structures/{id}` -- structure snapshot
/// - `GET`/`PUT /api/fsm_info` -- FSM description document
///
/// CORS allows any origin so views can be served from elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/ingest", get(ingest::ws_ingest))
        .route("/ws/events", get(ws::ws_events))
        // REST API
        .route("/api/session", get(handlers::get_session))
        .route("/api/events", get(handlers::list_events))
        .route("/api/events/count", get(handlers::count_events))
        .route("/api/fsm", get(handlers::list_fsms))
        .route("/api/fsm/{fsm}", get(handlers::get_fsm))
        .route("/api/fsm/{fsm}/regions/{region}", get(handlers::get_region))
        .route("/api/fsm/{fsm}/structures/{id}", get(handlers::get_structure))
        .route(
            "/api/fsm_info",
            get(handlers::get_fsm_info).put(handlers::put_fsm_info),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
