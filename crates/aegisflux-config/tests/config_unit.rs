// crates/aegisflux-config/tests/config_unit.rs
// ============================================================================
// Module: Config Unit Tests
// Description: Snapshot defaults, change application, and fetch behavior.
// Purpose: Validate copy-on-write snapshots and the bootstrap fetch path.
// Dependencies: aegisflux-config, aegisflux-bus, tiny_http, tokio
// ============================================================================

//! ## Overview
//! Exercises snapshot key parsing, the single-key-change law (a change
//! affects exactly its key), live updates over the bus, and the HTTP fetch
//! with a local fixture server.

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

use std::sync::Arc;
use std::time::Duration;

use aegisflux_bus::Bus;
use aegisflux_bus::CONFIG_CHANGED;
use aegisflux_bus::MemoryBus;
use aegisflux_config::ConfigChange;
use aegisflux_config::ConfigEntry;
use aegisflux_config::ConfigManager;
use aegisflux_config::ConfigSnapshot;
use aegisflux_config::KEY_MAX_CANARY_HOSTS;
use aegisflux_config::KEY_NEVER_BLOCK_LABELS;
use aegisflux_core::StrategyMode;
use bytes::Bytes;
use serde_json::json;

// ============================================================================
// SECTION: Snapshot Tests
// ============================================================================

#[test]
fn defaults_match_the_documented_values() {
    let snapshot = ConfigSnapshot::default();
    assert_eq!(snapshot.decision_mode, StrategyMode::Suggest);
    assert_eq!(snapshot.max_canary_hosts, 5);
    assert_eq!(snapshot.default_ttl_seconds, 3600);
    assert_eq!(
        snapshot.never_block_labels,
        vec!["role:db".to_string(), "role:control-plane".to_string()]
    );
}

#[test]
fn from_entries_overrides_only_listed_keys() {
    let entries = vec![
        ConfigEntry {
            key: KEY_MAX_CANARY_HOSTS.to_string(),
            value: json!(9),
        },
        ConfigEntry {
            key: "decision.mode".to_string(),
            value: json!("canary"),
        },
    ];
    let snapshot = ConfigSnapshot::from_entries(&entries);
    assert_eq!(snapshot.max_canary_hosts, 9);
    assert_eq!(snapshot.decision_mode, StrategyMode::Canary);
    assert_eq!(snapshot.default_ttl_seconds, 3600);
}

#[test]
fn change_applies_exactly_one_key_and_leaves_the_rest() {
    let base = ConfigSnapshot::default();
    let change = ConfigChange {
        key: KEY_NEVER_BLOCK_LABELS.to_string(),
        value: json!(["production"]),
        scope: None,
        updated_by: Some("ops".to_string()),
        timestamp: 1_700_000_000,
    };
    let next = base.with_change(&change);
    assert_eq!(next.never_block_labels, vec!["production".to_string()]);
    assert_eq!(next.last_updated, 1_700_000_000);
    assert_eq!(next.decision_mode, base.decision_mode);
    assert_eq!(next.max_canary_hosts, base.max_canary_hosts);
    assert_eq!(next.default_ttl_seconds, base.default_ttl_seconds);
}

#[test]
fn unknown_keys_are_ignored_but_still_stamp_last_updated() {
    let base = ConfigSnapshot::default();
    let change = ConfigChange {
        key: "decision.unknown_knob".to_string(),
        value: json!(true),
        scope: None,
        updated_by: None,
        timestamp: 42,
    };
    let next = base.with_change(&change);
    assert_eq!(next.last_updated, 42);
    assert_eq!(next.decision_mode, base.decision_mode);
    assert_eq!(next.never_block_labels, base.never_block_labels);
}

#[test]
fn malformed_values_leave_the_key_unchanged() {
    let base = ConfigSnapshot::default();
    let change = ConfigChange {
        key: KEY_MAX_CANARY_HOSTS.to_string(),
        value: json!("not-a-number"),
        scope: None,
        updated_by: None,
        timestamp: 7,
    };
    let next = base.with_change(&change);
    assert_eq!(next.max_canary_hosts, base.max_canary_hosts);
}

#[test]
fn never_block_labels_accept_comma_strings() {
    let base = ConfigSnapshot::default();
    let change = ConfigChange {
        key: KEY_NEVER_BLOCK_LABELS.to_string(),
        value: json!("role:db, role:cache"),
        scope: None,
        updated_by: None,
        timestamp: 1,
    };
    let next = base.with_change(&change);
    assert_eq!(next.never_block_labels, vec!["role:db".to_string(), "role:cache".to_string()]);
}

// ============================================================================
// SECTION: Manager Tests
// ============================================================================

#[tokio::test]
async fn bus_changes_reach_watch_subscribers() {
    let bus: Arc<dyn Bus> = Arc::new(MemoryBus::new());
    let manager = ConfigManager::new(ConfigSnapshot::default());
    let mut watcher = manager.subscribe();

    let run_manager = Arc::clone(&manager);
    let run_bus = Arc::clone(&bus);
    tokio::spawn(async move {
        let _ = run_manager.run(run_bus).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let change = ConfigChange {
        key: KEY_MAX_CANARY_HOSTS.to_string(),
        value: json!(2),
        scope: None,
        updated_by: None,
        timestamp: 10,
    };
    let payload = serde_json::to_vec(&change).expect("encode change");
    bus.publish(CONFIG_CHANGED, Bytes::from(payload)).await.expect("publish");

    tokio::time::timeout(Duration::from_secs(1), watcher.changed()).await.expect("notified").expect("sender alive");
    let snapshot = watcher.borrow().clone();
    assert_eq!(snapshot.max_canary_hosts, 2);
    assert_eq!(manager.current().max_canary_hosts, 2);
}

#[tokio::test]
async fn apply_change_is_idempotent() {
    let manager = ConfigManager::new(ConfigSnapshot::default());
    let change = ConfigChange {
        key: KEY_MAX_CANARY_HOSTS.to_string(),
        value: json!(3),
        scope: None,
        updated_by: None,
        timestamp: 5,
    };
    manager.apply_change(&change);
    let first = manager.current();
    manager.apply_change(&change);
    let second = manager.current();
    assert_eq!(*first, *second);
}

// ============================================================================
// SECTION: Fetch Tests
// ============================================================================

#[tokio::test]
async fn bootstrap_fetches_from_the_config_api() {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind fixture server");
    let addr = server.server_addr().to_ip().expect("ip addr");
    std::thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let body = json!([
                {"key": "decision.mode", "value": "observe"},
                {"key": "decision.default_ttl_seconds", "value": 120},
            ])
            .to_string();
            let response = tiny_http::Response::from_string(body).with_header(
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("header"),
            );
            let _ = request.respond(response);
        }
    });

    let manager =
        ConfigManager::bootstrap(Some(&format!("http://{addr}")), ConfigSnapshot::default()).await;
    let snapshot = manager.current();
    assert_eq!(snapshot.decision_mode, StrategyMode::Observe);
    assert_eq!(snapshot.default_ttl_seconds, 120);
    assert_eq!(snapshot.max_canary_hosts, 5);
}

#[tokio::test]
async fn bootstrap_falls_back_when_the_api_is_down() {
    let fallback = ConfigSnapshot {
        max_canary_hosts: 1,
        ..ConfigSnapshot::default()
    };
    let manager = ConfigManager::bootstrap(Some("http://127.0.0.1:1"), fallback.clone()).await;
    assert_eq!(*manager.current(), fallback);
}
