// crates/aegisflux-ingest/tests/ingest_unit.rs
// ============================================================================
// Module: Ingest Unit Tests
// Description: Schema gate and admit-path behavior tests.
// Purpose: Validate that only schema-valid events reach `events.raw`.
// Dependencies: aegisflux-bus, aegisflux-ingest, tokio
// ============================================================================

//! ## Overview
//! Exercises the embedded schema against boundary inputs (zero timestamp,
//! unknown type, missing fields) and the admit path's publish headers and
//! counters over the memory bus.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::HashMap;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::EVENTS_RAW;
use aegisflux_bus::MemoryBus;
use aegisflux_ingest::IngestMetrics;
use aegisflux_ingest::IngestState;
use aegisflux_ingest::SchemaValidator;
use aegisflux_ingest::proto;
use serde_json::json;
use tonic::Code;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn state_with_bus(bus: MemoryBus) -> IngestState {
    IngestState {
        validator: SchemaValidator::compile().expect("schema compiles"),
        bus: Arc::new(bus),
        metrics: Arc::new(IngestMetrics::new()),
    }
}

fn sample_proto_event() -> proto::Event {
    proto::Event {
        id: "evt-1".to_string(),
        r#type: "security".to_string(),
        source: "agent-7".to_string(),
        timestamp: 1_700_000_000_000,
        metadata: HashMap::from([("host_id".to_string(), "web-01".to_string())]),
        payload: vec![1, 2, 3],
    }
}

// ============================================================================
// SECTION: Schema Tests
// ============================================================================

#[test]
fn schema_accepts_a_well_formed_event() {
    let validator = SchemaValidator::compile().expect("schema compiles");
    let instance = json!({
        "id": "evt-1",
        "type": "security",
        "source": "agent-7",
        "timestamp": 1_700_000_000_000_i64,
        "metadata": {"host_id": "web-01"},
        "payload": "AQID",
    });
    assert!(validator.is_valid(&instance));
}

#[test]
fn schema_rejects_zero_and_negative_timestamps() {
    let validator = SchemaValidator::compile().expect("schema compiles");
    for timestamp in [0_i64, -1] {
        let instance = json!({
            "id": "evt-1",
            "type": "security",
            "source": "agent-7",
            "timestamp": timestamp,
        });
        assert!(!validator.is_valid(&instance), "timestamp {timestamp} must be rejected");
    }
}

#[test]
fn schema_rejects_unknown_event_types() {
    let validator = SchemaValidator::compile().expect("schema compiles");
    let instance = json!({
        "id": "evt-1",
        "type": "invalid-type",
        "source": "agent-7",
        "timestamp": 1,
    });
    assert!(validator.validate(&instance).is_err());
}

#[test]
fn schema_rejects_missing_required_fields() {
    let validator = SchemaValidator::compile().expect("schema compiles");
    let instance = json!({"id": "evt-1", "type": "security", "timestamp": 1});
    assert!(!validator.is_valid(&instance));
}

#[test]
fn schema_rejects_non_string_metadata_values() {
    let validator = SchemaValidator::compile().expect("schema compiles");
    let instance = json!({
        "id": "evt-1",
        "type": "security",
        "source": "agent-7",
        "timestamp": 1,
        "metadata": {"port": 443},
    });
    assert!(!validator.is_valid(&instance));
}

// ============================================================================
// SECTION: Admit Path Tests
// ============================================================================

#[tokio::test]
async fn admitted_events_are_published_with_headers() {
    let bus = MemoryBus::new();
    let mut sub = bus.subscribe(EVENTS_RAW).await.expect("subscribe");
    let state = state_with_bus(bus);

    state.admit(&sample_proto_event()).await.expect("admit");

    let message = sub.next().await.expect("published event");
    assert_eq!(message.headers.get("x-event-id"), Some(&"evt-1".to_string()));
    assert_eq!(message.headers.get("x-event-type"), Some(&"security".to_string()));
    assert_eq!(message.headers.get("x-event-source"), Some(&"agent-7".to_string()));
    assert_eq!(message.headers.get("x-timestamp"), Some(&"1700000000000".to_string()));
    assert_eq!(message.headers.get("x-host-id"), Some(&"web-01".to_string()));

    let body: serde_json::Value = serde_json::from_slice(&message.payload).expect("decode");
    assert_eq!(body["type"], json!("security"));
    assert_eq!(body["payload"], json!("AQID"));

    let counters = state.metrics.snapshot();
    assert_eq!(counters.events_received_total, 1);
    assert_eq!(counters.events_valid_total, 1);
    assert_eq!(counters.events_published_total, 1);
    assert_eq!(counters.events_invalid_total, 0);
}

#[tokio::test]
async fn invalid_events_are_rejected_before_any_publish() {
    let bus = MemoryBus::new();
    let mut sub = bus.subscribe(EVENTS_RAW).await.expect("subscribe");
    let state = state_with_bus(bus);

    let mut event = sample_proto_event();
    event.r#type = "invalid-type".to_string();
    let status = state.admit(&event).await.expect_err("must be rejected");
    assert_eq!(status.code(), Code::InvalidArgument);

    assert!(sub.try_next().is_none(), "nothing may reach events.raw");
    let counters = state.metrics.snapshot();
    assert_eq!(counters.events_invalid_total, 1);
    assert_eq!(counters.events_published_total, 0);
}

#[tokio::test]
async fn host_header_is_omitted_without_metadata() {
    let bus = MemoryBus::new();
    let mut sub = bus.subscribe(EVENTS_RAW).await.expect("subscribe");
    let state = state_with_bus(bus);

    let mut event = sample_proto_event();
    event.metadata.clear();
    event.payload.clear();
    state.admit(&event).await.expect("admit");

    let message = sub.next().await.expect("published event");
    assert!(!message.headers.contains_key("x-host-id"));
    let body: serde_json::Value = serde_json::from_slice(&message.payload).expect("decode");
    assert!(body.get("metadata").is_none());
    assert!(body.get("payload").is_none());
}
