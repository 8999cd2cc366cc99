// crates/aegisflux-correlator/tests/evaluator_unit.rs
// ============================================================================
// Module: Evaluator Unit Tests
// Description: End-to-end engine behavior over an in-memory bus.
// Purpose: Validate matching, dedup, overrides, and publication headers.
// Dependencies: aegisflux-bus, aegisflux-correlator, tempfile, tokio
// ============================================================================

//! ## Overview
//! Drives [`aegisflux_correlator::CorrelatorEngine`] with enriched-event
//! payloads against a temp rule directory and asserts findings land in the
//! store and on `correlator.findings` with the contract header set.

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

use std::path::Path;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::CORRELATOR_FINDINGS;
use aegisflux_bus::MemoryBus;
use aegisflux_core::Finding;
use aegisflux_core::FindingStatus;
use aegisflux_core::Severity;
use aegisflux_correlator::CorrelatorEngine;
use aegisflux_correlator::CorrelatorMetrics;
use aegisflux_correlator::FindingPublisher;
use aegisflux_correlator::FindingStore;
use aegisflux_correlator::OverrideManager;
use aegisflux_correlator::OverrideRequest;
use aegisflux_correlator::PublisherConfig;
use aegisflux_correlator::RuleLoader;
use aegisflux_correlator::WindowBuffer;
use serde_json::json;
use tempfile::TempDir;
use tempfile::tempdir;

// ============================================================================
// SECTION: Harness
// ============================================================================

struct Harness {
    engine: Arc<CorrelatorEngine>,
    store: Arc<FindingStore>,
    overrides: Arc<OverrideManager>,
    metrics: Arc<CorrelatorMetrics>,
    bus: MemoryBus,
    _rules_dir: TempDir,
}

fn write_rule(dir: &Path, file: &str, body: &serde_json::Value) {
    std::fs::write(dir.join(file), body.to_string()).expect("write rule file");
}

fn burst_rule(rule_id: &str, min_count: u32, severity: &str) -> serde_json::Value {
    json!({
        "rule_id": rule_id,
        "description": "repeated connections from one host",
        "selectors": {"host_patterns": ["web-*"]},
        "condition": {
            "window": {"duration_seconds": 300, "type": "sliding"},
            "min_count": min_count,
            "where": {"event_type": "connect"},
        },
        "outcome": {
            "severity": severity,
            "confidence": 0.9,
            "title": "Network connection burst",
            "tags": ["network"],
            "ttl_seconds": 300,
        },
    })
}

fn harness(rules: &[(&str, serde_json::Value)]) -> Harness {
    let rules_dir = tempdir().expect("tempdir");
    for (file, body) in rules {
        write_rule(rules_dir.path(), file, body);
    }
    let loader = RuleLoader::new(rules_dir.path());
    loader.load().expect("load rules");

    let bus = MemoryBus::new();
    let overrides = OverrideManager::new();
    let store = Arc::new(FindingStore::new(100));
    let metrics = Arc::new(CorrelatorMetrics::new());
    let publisher =
        FindingPublisher::new(Arc::new(bus.clone()) as Arc<dyn Bus>, PublisherConfig::default());
    let engine = Arc::new(CorrelatorEngine::new(
        loader,
        Arc::clone(&overrides),
        WindowBuffer::new(),
        Arc::clone(&store),
        publisher,
        Arc::clone(&metrics),
        1000,
    ));
    Harness {
        engine,
        store,
        overrides,
        metrics,
        bus,
        _rules_dir: rules_dir,
    }
}

fn connect_event(host: &str, ts: i64) -> Vec<u8> {
    json!({"host_id": host, "event_type": "connect", "timestamp": ts}).to_string().into_bytes()
}

// ============================================================================
// SECTION: Matching and Dedup
// ============================================================================

#[tokio::test]
async fn min_count_gates_the_first_event_and_admits_the_second() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 2, "high"))]);

    assert_eq!(h.engine.handle_payload(&connect_event("web-01", 10_000), 10_000).await, 0);
    assert!(h.store.is_empty());

    assert_eq!(h.engine.handle_payload(&connect_event("web-01", 20_000), 20_000).await, 1);
    let findings = h.store.query(None, None, 10);
    assert_eq!(findings.len(), 1);
    let finding: &Finding = &findings[0];
    assert_eq!(finding.rule_id.as_str(), "burst-connect");
    assert_eq!(finding.host_id.as_str(), "web-01");
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.status, FindingStatus::Open);
    assert_eq!(finding.ttl_seconds, 300);
    assert_eq!(finding.tags, vec!["network".to_string()]);
    assert_eq!(finding.evidence.schema_version, 1);
    assert!(finding.evidence.items.len() >= 2);
    assert!(finding.correlation_id.is_some());
}

#[tokio::test]
async fn duplicate_candidates_in_one_bucket_are_dropped() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 2, "high"))]);

    let _ = h.engine.handle_payload(&connect_event("web-01", 10_000), 10_000).await;
    let _ = h.engine.handle_payload(&connect_event("web-01", 20_000), 20_000).await;
    // Same (rule, host, bucket, primary evidence): dedup must drop it.
    assert_eq!(h.engine.handle_payload(&connect_event("web-01", 30_000), 30_000).await, 0);

    assert_eq!(h.store.len(), 1);
    assert_eq!(h.metrics.snapshot().findings_deduped_total, 1);
    assert_eq!(h.metrics.snapshot().findings_emitted_total, 1);
}

#[tokio::test]
async fn findings_are_published_with_the_contract_headers() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 2, "high"))]);
    let mut sub = h.bus.subscribe(CORRELATOR_FINDINGS).await.expect("subscribe");

    let _ = h.engine.handle_payload(&connect_event("web-01", 10_000), 10_000).await;
    let _ = h.engine.handle_payload(&connect_event("web-01", 20_000), 20_000).await;

    let message = sub.next().await.expect("published finding");
    let published: Finding = serde_json::from_slice(&message.payload).expect("decode finding");
    assert_eq!(message.headers.get("x-finding-id"), Some(&published.id.to_string()));
    assert_eq!(message.headers.get("x-host-id"), Some(&"web-01".to_string()));
    assert_eq!(message.headers.get("x-rule-id"), Some(&"burst-connect".to_string()));
    assert_eq!(message.headers.get("x-severity"), Some(&"high".to_string()));
    assert!(message.headers.contains_key("x-timestamp"));
    assert!(message.headers.contains_key("x-correlation-id"));

    let stored = h.store.query(None, None, 1);
    assert_eq!(stored[0], published);
}

#[tokio::test]
async fn selectors_reject_hosts_outside_the_pattern() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 1, "high"))]);
    assert_eq!(h.engine.handle_payload(&connect_event("db-01", 10_000), 10_000).await, 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn non_matching_event_types_never_fire() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 1, "high"))]);
    let payload =
        json!({"host_id": "web-01", "event_type": "exec", "timestamp": 10_000}).to_string();
    assert_eq!(h.engine.handle_payload(payload.as_bytes(), 10_000).await, 0);
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

#[tokio::test]
async fn disable_override_suppresses_the_rule() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 1, "high"))]);
    h.overrides
        .add(OverrideRequest {
            rule_id: "burst-connect".into(),
            enabled: Some(false),
            severity: None,
            confidence: None,
            ttl_seconds: None,
            expires_in_seconds: None,
        })
        .expect("add override");

    assert_eq!(h.engine.handle_payload(&connect_event("web-01", 10_000), 10_000).await, 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn severity_and_confidence_overrides_shape_the_finding() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 1, "high"))]);
    h.overrides
        .add(OverrideRequest {
            rule_id: "burst-connect".into(),
            enabled: None,
            severity: Some(Severity::Low),
            confidence: Some(0.25),
            ttl_seconds: Some(60),
            expires_in_seconds: None,
        })
        .expect("add override");

    let _ = h.engine.handle_payload(&connect_event("web-01", 10_000), 10_000).await;
    let findings = h.store.query(None, None, 1);
    assert_eq!(findings[0].severity, Severity::Low);
    assert!((findings[0].confidence - 0.25).abs() < f64::EPSILON);
    assert_eq!(findings[0].ttl_seconds, 60);
}

// ============================================================================
// SECTION: Snapshot Order and Robustness
// ============================================================================

#[tokio::test]
async fn each_matching_rule_emits_one_finding_in_snapshot_order() {
    let h = harness(&[
        ("a.json", burst_rule("rule-a", 1, "low")),
        ("b.json", burst_rule("rule-b", 1, "critical")),
    ]);

    assert_eq!(h.engine.handle_payload(&connect_event("web-01", 10_000), 10_000).await, 2);
    let newest_first = h.store.query(None, None, 10);
    assert_eq!(newest_first.len(), 2);
    assert_eq!(newest_first[0].rule_id.as_str(), "rule-b");
    assert_eq!(newest_first[1].rule_id.as_str(), "rule-a");
}

#[tokio::test]
async fn undecodable_payloads_count_as_invalid_and_do_not_halt() {
    let h = harness(&[("a.json", burst_rule("burst-connect", 1, "high"))]);
    assert_eq!(h.engine.handle_payload(b"{not json", 10_000).await, 0);
    assert_eq!(h.metrics.snapshot().events_invalid_total, 1);

    // The pipeline keeps working afterwards.
    assert_eq!(h.engine.handle_payload(&connect_event("web-01", 11_000), 11_000).await, 1);
}

#[tokio::test]
async fn severity_query_filters_at_or_above_the_floor() {
    let h = harness(&[
        ("a.json", burst_rule("rule-a", 1, "low")),
        ("b.json", burst_rule("rule-b", 1, "critical")),
    ]);
    let _ = h.engine.handle_payload(&connect_event("web-01", 10_000), 10_000).await;

    let high_and_up = h.store.query(None, Some(Severity::High), 10);
    assert_eq!(high_and_up.len(), 1);
    assert_eq!(high_and_up[0].rule_id.as_str(), "rule-b");
}
