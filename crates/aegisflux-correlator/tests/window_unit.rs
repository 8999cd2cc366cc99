// crates/aegisflux-correlator/tests/window_unit.rs
// ============================================================================
// Module: Window Buffer Unit Tests
// Description: Insert, live-read, and eviction boundary tests.
// Purpose: Validate per-bucket windows and the sweeper grace horizon.
// Dependencies: aegisflux-correlator, serde_json
// ============================================================================

//! ## Overview
//! Exercises [`aegisflux_correlator::WindowBuffer`] time arithmetic: windows
//! open at the event time, close after the rule duration, and are evicted
//! strictly after `now - grace`.

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

use aegisflux_core::HostId;
use aegisflux_core::RuleId;
use aegisflux_correlator::WindowBuffer;
use serde_json::json;

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

fn ids() -> (RuleId, HostId) {
    (RuleId::new("rule-1"), HostId::new("web-01"))
}

fn event() -> Arc<serde_json::Value> {
    Arc::new(json!({"host_id": "web-01", "event_type": "connect"}))
}

// ============================================================================
// SECTION: Insert and Live Reads
// ============================================================================

#[test]
fn live_returns_entries_whose_windows_are_open() {
    let buffer = WindowBuffer::new();
    let (rule, host) = ids();
    buffer.insert(&rule, &host, event(), 10_000, 60);

    let live = buffer.live(&rule, &host, 10_000);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].window_start, 10_000);
    assert_eq!(live[0].window_end, 70_000);

    // Still open at the boundary, closed one millisecond after.
    assert_eq!(buffer.live(&rule, &host, 70_000).len(), 1);
    assert_eq!(buffer.live(&rule, &host, 70_001).len(), 0);
}

#[test]
fn buckets_are_isolated_per_rule_and_host() {
    let buffer = WindowBuffer::new();
    let (rule, host) = ids();
    let other_rule = RuleId::new("rule-2");
    let other_host = HostId::new("db-01");

    buffer.insert(&rule, &host, event(), 1_000, 60);
    buffer.insert(&other_rule, &host, event(), 1_000, 60);
    buffer.insert(&rule, &other_host, event(), 1_000, 60);

    assert_eq!(buffer.live(&rule, &host, 1_000).len(), 1);
    assert_eq!(buffer.live(&other_rule, &host, 1_000).len(), 1);
    assert_eq!(buffer.live(&rule, &other_host, 1_000).len(), 1);
    assert_eq!(buffer.len(), 3);
}

#[test]
fn entries_stay_ordered_by_insertion() {
    let buffer = WindowBuffer::new();
    let (rule, host) = ids();
    for ts in [1_000, 2_000, 3_000] {
        buffer.insert(&rule, &host, event(), ts, 60);
    }
    let live = buffer.live(&rule, &host, 3_000);
    let starts: Vec<i64> = live.iter().map(|entry| entry.window_start).collect();
    assert_eq!(starts, vec![1_000, 2_000, 3_000]);
}

// ============================================================================
// SECTION: Eviction
// ============================================================================

#[test]
fn sweep_evicts_strictly_older_than_the_grace_horizon() {
    let buffer = WindowBuffer::new();
    let (rule, host) = ids();
    // window_end = 1_000 + 10_000 = 11_000.
    buffer.insert(&rule, &host, event(), 1_000, 10);

    // Horizon = 21_000 - 10_000 = 11_000: entry is not strictly older.
    assert_eq!(buffer.sweep(21_000, 10), 0);
    assert_eq!(buffer.len(), 1);

    // Horizon = 21_001 - 10_000 = 11_001: entry is evicted.
    assert_eq!(buffer.sweep(21_001, 10), 1);
    assert!(buffer.is_empty());
}

#[test]
fn sweep_drops_emptied_buckets_but_keeps_live_ones() {
    let buffer = WindowBuffer::new();
    let (rule, host) = ids();
    buffer.insert(&rule, &host, event(), 1_000, 10);
    buffer.insert(&rule, &host, event(), 500_000, 10);

    let evicted = buffer.sweep(520_000, 60);
    assert_eq!(evicted, 1);
    assert_eq!(buffer.live(&rule, &host, 505_000).len(), 1);
}
