//! Integration tests for the inspector API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fsm_inspect_observer::router::build_router;
use fsm_inspect_observer::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

const FSM: &str = "Lights";

async fn make_test_state() -> Arc<AppState> {
    let state = Arc::new(AppState::new());

    let messages = [
        json!({
            "common": {"id": 0, "fsm": FSM, "modified_structures": []},
            "event": {"StateTransitionStart": {
                "transition_id": {"Table": 1}, "region_id": 0, "from": "Off", "to": "On"
            }}
        }),
        json!({
            "common": {"id": 1, "fsm": FSM, "modified_structures": [
                {"id": "Context", "value": {"switches": 1}},
                {"id": {"State": "On"}, "value": {"brightness": 80}}
            ]},
            "event": {"StateTransitioned": {
                "transition_id": {"Table": 1}, "region_id": 0, "from": "Off", "to": "On"
            }}
        }),
        json!({
            "common": {"id": 2, "fsm": "Fan", "modified_structures": []},
            "event": {"ProcessingEvent": {"event_kind": "Spin", "event_data": {"rpm": 900}}}
        }),
    ];

    {
        let mut inspector = state.inspector.write().await;
        inspector.begin_session();
        for message in &messages {
            inspector.ingest_value(message).unwrap();
        }
        assert!(inspector.ingest_text("{\"common\": 1}").is_err());
    }

    state
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let router = build_router(state);
    let response = router
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_session_reports_counters() {
    let (status, json) = get(make_test_state().await, "/api/session").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["status"], "open");
    assert_eq!(json["event_count"], 3);
    assert_eq!(json["stats"]["messages_received"], 4);
    assert_eq!(json["stats"]["messages_rejected"], 1);
}

#[tokio::test]
async fn test_session_is_null_before_first_producer() {
    let (status, json) = get(Arc::new(AppState::new()), "/api/session").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["session"].is_null());
    assert_eq!(json["event_count"], 0);
}

#[tokio::test]
async fn test_list_events_in_order() {
    let (status, json) = get(make_test_state().await, "/api/events").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    let ids: Vec<u64> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event"]["sequence_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, [0, 1, 2]);
}

#[tokio::test]
async fn test_list_events_filters() {
    let state = make_test_state().await;

    let (_, by_fsm) = get(Arc::clone(&state), "/api/events?fsm=Fan").await;
    assert_eq!(by_fsm["count"], 1);
    assert_eq!(by_fsm["events"][0]["event"]["fsm_name"], "Fan");

    let (_, after) = get(Arc::clone(&state), "/api/events?after=0&limit=1").await;
    assert_eq!(after["count"], 1);
    assert_eq!(after["events"][0]["event"]["sequence_id"], 1);
}

#[tokio::test]
async fn test_event_count() {
    let (status, json) = get(make_test_state().await, "/api/events/count").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
}

#[tokio::test]
async fn test_list_fsms() {
    let (status, json) = get(make_test_state().await, "/api/fsm").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fsms"], json!(["Fan", "Lights"]));
}

#[tokio::test]
async fn test_fsm_overview() {
    let (status, json) = get(make_test_state().await, "/api/fsm/Lights").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["regions"]["0"], "On");
    assert_eq!(json["structures"]["context"], json!({"switches": 1}));
    assert_eq!(json["structures"]["state_On"], json!({"brightness": 80}));
}

#[tokio::test]
async fn test_fsm_not_found() {
    let (status, json) = get(make_test_state().await, "/api/fsm/Toaster").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_region_active_state() {
    let state = make_test_state().await;

    let (status, json) = get(Arc::clone(&state), "/api/fsm/Lights/regions/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active_state"], "On");

    // A region with no completed transition has no active state.
    let (status, _) = get(state, "/api/fsm/Lights/regions/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_structure_snapshot() {
    let state = make_test_state().await;

    let (status, json) = get(Arc::clone(&state), "/api/fsm/Lights/structures/context").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], json!({"switches": 1}));

    let (status, json) = get(Arc::clone(&state), "/api/fsm/Lights/structures/state_On").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"]["brightness"], 80);

    let (status, _) = get(Arc::clone(&state), "/api/fsm/Fan/structures/context").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(state, "/api/fsm/Lights/structures/bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fsm_info_round_trip() {
    let state = make_test_state().await;

    let (status, _) = get(Arc::clone(&state), "/api/fsm_info").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let info = json!({"name": FSM, "regions": [{"id": 0, "states": ["Off", "On"]}]});
    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::put("/api/fsm_info")
                .header("content-type", "application/json")
                .body(Body::from(info.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, json) = get(state, "/api/fsm_info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, info);
}

#[tokio::test]
async fn test_second_producer_is_refused() {
    let state = make_test_state().await;
    let _producer = state.claim_producer().unwrap();

    let (status, json) = get(state, "/ws/ingest").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn test_ingest_requires_upgrade() {
    let state = Arc::new(AppState::new());
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(Request::get("/ws/ingest").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::CONFLICT);
    assert!(response.status().is_client_error());
    // The failed upgrade released the producer slot.
    assert!(state.claim_producer().is_some());
}
