//! End-to-end ingestion through the public core API.

#![allow(clippy::unwrap_used)]

use fsm_inspect_core::{
    DecodeError, DerivedIndices, Inspector, Publisher, SessionEnd, Transition, run_session,
    session,
};
use fsm_inspect_types::{DataStructureId, EventKind, TransitionId};
use futures::stream;
use serde_json::{Value, json};

const FSM: &str = "Worker";

fn transition_message(tag: &str, id: u64, structures: Value) -> Value {
    json!({
        "common": {"id": id, "fsm": FSM, "modified_structures": structures},
        "event": {tag: {
            "transition_id": {"Table": 1},
            "region_id": 0,
            "from": "Idle",
            "to": "Running"
        }}
    })
}

#[test]
fn transition_start_then_complete_with_context() {
    let mut inspector = Inspector::new();
    inspector
        .ingest_value(&transition_message("StateTransitionStart", 0, json!([])))
        .unwrap();
    assert_eq!(inspector.active_state(FSM, 0), None);

    inspector
        .ingest_value(&transition_message(
            "StateTransitioned",
            1,
            json!([{"id": "Context", "value": {"count": 1}}]),
        ))
        .unwrap();

    assert_eq!(inspector.active_state(FSM, 0), Some("Running"));
    assert_eq!(
        inspector.structure_snapshot(FSM, &DataStructureId::Context),
        Some(&json!({"count": 1}))
    );
    assert_eq!(inspector.event_count(), 2);
}

#[test]
fn malformed_message_between_valid_ones_is_skipped() {
    let mut inspector = Inspector::new();
    let before = inspector.event_count();

    inspector
        .ingest_value(&transition_message("StateTransitionStart", 0, json!([])))
        .unwrap();
    let unknown = json!({
        "common": {"id": 1, "fsm": FSM, "modified_structures": []},
        "event": {"Teleported": {"to": "Elsewhere"}}
    });
    assert!(matches!(
        inspector.ingest_value(&unknown),
        Err(DecodeError::UnknownEventTag { .. })
    ));
    inspector
        .ingest_value(&transition_message("StateTransitioned", 2, json!([])))
        .unwrap();

    assert_eq!(inspector.event_count().saturating_sub(before), 2);
    let ids: Vec<u64> = inspector.events().map(|e| e.sequence_id).collect();
    assert_eq!(ids, [0, 2]);
    assert_eq!(inspector.active_state(FSM, 0), Some("Running"));
}

#[test]
fn sentinel_transition_ids_survive_ingestion() {
    let mut inspector = Inspector::new();
    let message = json!({
        "common": {"id": 0, "fsm": FSM},
        "event": {"StateTransitioned": {
            "transition_id": {"Start": null}, "region_id": 3, "from": "Init", "to": "Idle"
        }}
    });
    let entry = inspector.ingest_value(&message).unwrap();
    assert_eq!(entry.event.transition_id(), Some(TransitionId::Start));
    assert_eq!(inspector.active_state(FSM, 3), Some("Idle"));
}

#[test]
fn publisher_output_replays_to_identical_indices() {
    let mut publisher = Publisher::new();
    let mut inspector = Inspector::new();
    let mut subscription = inspector.subscribe();

    let to_running = Transition {
        transition_id: TransitionId::TableEntry(1),
        region: 0,
        from: "Idle",
        to: "Running",
    };
    let messages = [
        publisher.processing_event(FSM, "Start", json!({"job": 7})),
        publisher.transition_started(FSM, to_running, json!({"count": 0})),
        publisher.action(
            FSM,
            TransitionId::TableEntry(1),
            "begin",
            json!({"count": 1}),
            [(String::from("Idle"), json!({}))],
        ),
        publisher.transition_completed(FSM, to_running, json!({"count": 1})),
    ];
    for message in &messages {
        let text = serde_json::to_string(message).unwrap();
        inspector.ingest_text(&text).unwrap();
    }

    assert_eq!(inspector.event_count(), 4);
    assert_eq!(inspector.stats().messages_rejected, 0);
    assert_eq!(inspector.active_state(FSM, 0), Some("Running"));
    assert_eq!(
        inspector.structure_snapshot(FSM, &DataStructureId::State(String::from("Idle"))),
        Some(&json!({}))
    );

    let mut live = Vec::new();
    while let Some(event) = subscription.try_recv() {
        live.extend(event.entry().map(|entry| entry.event.sequence_id));
    }
    assert_eq!(live, [0, 1, 2, 3]);
    assert!(matches!(
        inspector.entries().last().map(|e| &e.event.kind),
        Some(EventKind::TransitionCompleted(_))
    ));

    let replayed = DerivedIndices::replay(inspector.entries().iter().map(AsRef::as_ref));
    assert_eq!(&replayed, inspector.indices());
}

#[tokio::test]
async fn session_over_a_frame_stream() {
    let shared = session::shared();
    let mut publisher = Publisher::new();
    let frames: Vec<Result<String, std::io::Error>> = vec![
        Ok(serde_json::to_string(&publisher.processing_event(FSM, "Go", Value::Null)).unwrap()),
        Ok(String::from(r#"{"common": {"id": 99}}"#)),
        Ok(serde_json::to_string(&publisher.processing_event(FSM, "Stop", Value::Null)).unwrap()),
    ];

    let outcome = run_session(&shared, stream::iter(frames)).await;
    assert_eq!(outcome.end, SessionEnd::StreamEnded);

    let inspector = shared.read().await;
    assert_eq!(inspector.event_count(), 2);
    let stats = inspector.stats();
    assert_eq!(stats.messages_received, 3);
    assert_eq!(stats.events_accepted, 2);
    assert_eq!(stats.messages_rejected, 1);
}
