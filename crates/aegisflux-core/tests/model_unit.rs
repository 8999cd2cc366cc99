// crates/aegisflux-core/tests/model_unit.rs
// ============================================================================
// Module: Core Model Unit Tests
// Description: Wire-form and invariant tests for the domain model.
// Purpose: Validate serde stability, ordering, and metadata round-trips.
// Dependencies: aegisflux-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises the closed wire enums, event boundary validation, forgiving
//! enriched-event deserialization, and the artifact/metadata round-trip law.

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

use std::collections::BTreeMap;
use std::str::FromStr;

use aegisflux_core::Artifact;
use aegisflux_core::ArtifactId;
use aegisflux_core::CoreError;
use aegisflux_core::EnrichedEvent;
use aegisflux_core::Event;
use aegisflux_core::EventType;
use aegisflux_core::Severity;
use aegisflux_core::StrategyMode;
use serde_json::json;

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

fn sample_event() -> Event {
    Event {
        id: "evt-1".into(),
        event_type: EventType::Security,
        source: "agent-7".to_string(),
        timestamp: 1_700_000_000_000,
        metadata: BTreeMap::from([("host_id".to_string(), "web-01".to_string())]),
        payload: Some(vec![1, 2, 3]),
    }
}

fn sample_artifact() -> Artifact {
    Artifact {
        id: ArtifactId::new("art-1"),
        name: "exec-tracer".to_string(),
        version: "1.4.0".to_string(),
        description: "Process execution tracer".to_string(),
        artifact_type: "ebpf_bundle".to_string(),
        architecture: "x86_64".to_string(),
        kernel_version: ">=5.15".to_string(),
        tags: vec!["tracer".to_string()],
        hosts: Some(vec!["web-01".to_string()]),
        signature: Some("sig".to_string()),
        size: 4096,
        checksum: "ab".repeat(32),
        metadata: BTreeMap::from([("team".to_string(), "detect".to_string())]),
        created_at: 1_700_000_000_123,
        updated_at: 1_700_000_500_456,
    }
}

// ============================================================================
// SECTION: Event Tests
// ============================================================================

#[test]
fn event_round_trips_with_base64_payload() {
    let event = sample_event();
    let wire = serde_json::to_value(&event).expect("serialize");
    assert_eq!(wire["type"], json!("security"));
    assert_eq!(wire["payload"], json!("AQID"));
    let back: Event = serde_json::from_value(wire).expect("deserialize");
    assert_eq!(back, event);
}

#[test]
fn event_rejects_unknown_type_on_the_wire() {
    let wire = json!({
        "id": "evt-1",
        "type": "invalid-type",
        "source": "agent-7",
        "timestamp": 1,
    });
    let result: Result<Event, _> = serde_json::from_value(wire);
    assert!(result.is_err());
}

#[test]
fn event_validation_rejects_non_positive_timestamps() {
    let mut event = sample_event();
    event.timestamp = 0;
    assert!(matches!(event.validate(), Err(CoreError::InvalidInput(_))));
    event.timestamp = -5;
    assert!(matches!(event.validate(), Err(CoreError::InvalidInput(_))));
    event.timestamp = 1;
    assert!(event.validate().is_ok());
}

#[test]
fn event_host_id_reads_from_metadata() {
    let event = sample_event();
    assert_eq!(event.host_id(), Some("web-01"));
}

// ============================================================================
// SECTION: Enriched Event Tests
// ============================================================================

#[test]
fn enriched_event_accepts_type_alias_and_missing_timestamp() {
    let wire = json!({
        "host_id": "web-01",
        "type": "connect",
        "args": {"port": 443},
    });
    let event: EnrichedEvent = serde_json::from_value(wire).expect("deserialize");
    assert_eq!(event.event_type.as_deref(), Some("connect"));
    assert_eq!(event.timestamp, None);
    assert_eq!(event.timestamp_or(42), 42);
}

#[test]
fn enriched_event_accepts_explicit_event_type_key() {
    let wire = json!({
        "host_id": "web-01",
        "event_type": "exec",
        "timestamp": 1_700_000_000_000_i64,
    });
    let event: EnrichedEvent = serde_json::from_value(wire).expect("deserialize");
    assert_eq!(event.event_type.as_deref(), Some("exec"));
    assert_eq!(event.timestamp_or(0), 1_700_000_000_000);
}

// ============================================================================
// SECTION: Ordering Tests
// ============================================================================

#[test]
fn severity_orders_low_to_critical() {
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::Medium < Severity::High);
    assert!(Severity::High < Severity::Critical);
}

#[test]
fn severity_parses_only_the_closed_set() {
    assert_eq!(Severity::from_str("critical").expect("parse"), Severity::Critical);
    assert!(Severity::from_str("urgent").is_err());
}

#[test]
fn strategy_modes_enumerate_most_to_least_aggressive() {
    let labels: Vec<&str> = StrategyMode::ALL.iter().map(|mode| mode.as_str()).collect();
    assert_eq!(
        labels,
        vec!["enforce", "aggressive", "canary", "balanced", "suggest", "conservative", "observe"]
    );
    assert!(StrategyMode::Enforce.is_enforcing());
    assert!(StrategyMode::Aggressive.is_enforcing());
    assert!(!StrategyMode::Canary.is_enforcing());
}

#[test]
fn strategy_mode_parses_only_the_closed_set() {
    for mode in StrategyMode::ALL {
        assert_eq!(StrategyMode::from_str(mode.as_str()).expect("parse"), mode);
    }
    assert!(StrategyMode::from_str("yolo").is_err());
}

// ============================================================================
// SECTION: Artifact Round-Trip Tests
// ============================================================================

#[test]
fn artifact_metadata_round_trip_is_lossless() {
    let artifact = sample_artifact();
    let metadata = artifact.to_metadata().expect("to metadata");
    assert!(metadata.created_at.contains('T'));
    let back = metadata.into_artifact().expect("into artifact");
    assert_eq!(back, artifact);
}

#[test]
fn artifact_metadata_wire_form_uses_rfc3339_and_type_key() {
    let metadata = sample_artifact().to_metadata().expect("to metadata");
    let wire = serde_json::to_value(&metadata).expect("serialize");
    assert_eq!(wire["type"], json!("ebpf_bundle"));
    assert_eq!(wire["checksum"].as_str().map(str::len), Some(64));
    let created = wire["created_at"].as_str().expect("created_at");
    assert!(created.ends_with('Z') || created.contains('+'));
}

// ============================================================================
// SECTION: Error Mapping Tests
// ============================================================================

#[test]
fn error_kinds_map_to_expected_http_statuses() {
    assert_eq!(CoreError::InvalidInput(String::new()).http_status(), 400);
    assert_eq!(CoreError::NotFound(String::new()).http_status(), 404);
    assert_eq!(CoreError::Unauthorized(String::new()).http_status(), 401);
    assert_eq!(CoreError::Unavailable(String::new()).http_status(), 503);
    assert_eq!(CoreError::Conflict(String::new()).http_status(), 409);
    assert_eq!(CoreError::Internal(String::new()).http_status(), 500);
}
