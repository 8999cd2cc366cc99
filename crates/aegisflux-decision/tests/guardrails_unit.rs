// crates/aegisflux-decision/tests/guardrails_unit.rs
// ============================================================================
// Module: Guardrails Unit Tests
// Description: Downgrade chains, never-block caps, and canary sizing.
// Purpose: Validate the pure strategy decider across the rule order.
// Dependencies: aegisflux-decision, aegisflux-core
// ============================================================================

//! ## Overview
//! Exercises [`aegisflux_decision::decide_strategy`]: maintenance-window
//! downgrades (overnight wrap included), never-block label caps,
//! zero-canary downgrades, ttl emission, and input-determinism including
//! the order of reasons.

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

use aegisflux_core::StrategyMode;
use aegisflux_decision::GuardrailsConfig;
use aegisflux_decision::decide_strategy;
use aegisflux_decision::guardrails::parse_maintenance_window;
use aegisflux_decision::guardrails::window_contains;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn config() -> GuardrailsConfig {
    GuardrailsConfig {
        maintenance_window: None,
        never_block_labels: vec!["role:db".to_string(), "role:control-plane".to_string()],
        max_canary_hosts: 5,
        default_ttl_seconds: 3600,
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

// ============================================================================
// SECTION: Never-Block Cap
// ============================================================================

#[test]
fn enforce_is_capped_to_canary_by_never_block_labels() {
    let mut cfg = config();
    cfg.never_block_labels = vec!["production".to_string()];

    let decision =
        decide_strategy(StrategyMode::Enforce, 3, &labels(&["production", "web"]), &cfg, 12);
    assert_eq!(decision.strategy, StrategyMode::Canary);
    assert_eq!(decision.canary_size, 3);
    assert!(decision.applied_rules.contains(&"never_block_labels".to_string()));
}

#[test]
fn capped_canary_with_zero_budget_falls_to_suggest() {
    let mut cfg = config();
    cfg.never_block_labels = vec!["production".to_string()];
    cfg.max_canary_hosts = 0;

    let decision =
        decide_strategy(StrategyMode::Enforce, 3, &labels(&["production", "web"]), &cfg, 12);
    assert_eq!(decision.strategy, StrategyMode::Suggest);
    assert_eq!(decision.canary_size, 0);
    assert!(decision.applied_rules.contains(&"never_block_labels".to_string()));
    assert!(decision.applied_rules.contains(&"canary_size_zero".to_string()));
}

#[test]
fn never_block_matching_is_case_insensitive_containment_both_ways() {
    let mut cfg = config();
    cfg.never_block_labels = vec!["role:db".to_string()];

    // Host label contains the never-block label.
    let contains =
        decide_strategy(StrategyMode::Enforce, 2, &labels(&["Role:DB-primary"]), &cfg, 12);
    assert_eq!(contains.strategy, StrategyMode::Canary);

    // Never-block label contains the host label.
    let contained = decide_strategy(StrategyMode::Aggressive, 2, &labels(&["role"]), &cfg, 12);
    assert_eq!(contained.strategy, StrategyMode::Canary);
}

#[test]
fn softer_strategies_pass_never_block_unchanged() {
    let mut cfg = config();
    cfg.never_block_labels = vec!["production".to_string()];

    let suggest = decide_strategy(StrategyMode::Suggest, 3, &labels(&["production"]), &cfg, 12);
    assert_eq!(suggest.strategy, StrategyMode::Suggest);
    assert!(!suggest.applied_rules.contains(&"never_block_labels".to_string()));

    let canary = decide_strategy(StrategyMode::Canary, 3, &labels(&["production"]), &cfg, 12);
    assert_eq!(canary.strategy, StrategyMode::Canary);
    assert_eq!(canary.canary_size, 3);
}

#[test]
fn final_strategy_is_never_enforcing_when_labels_match() {
    let mut cfg = config();
    cfg.never_block_labels = vec!["role:db".to_string()];
    for desired in StrategyMode::ALL {
        let decision = decide_strategy(desired, 4, &labels(&["role:db"]), &cfg, 12);
        assert!(
            !decision.strategy.is_enforcing(),
            "desired {desired:?} must not stay enforcing"
        );
    }
}

// ============================================================================
// SECTION: Maintenance Window
// ============================================================================

#[test]
fn overnight_window_downgrades_enforce_to_canary() {
    let mut cfg = config();
    cfg.maintenance_window = Some((22, 6));

    let decision = decide_strategy(StrategyMode::Enforce, 3, &labels(&["web"]), &cfg, 23);
    assert_eq!(decision.strategy, StrategyMode::Canary);
    assert_eq!(decision.canary_size, 3);
    assert!(decision.applied_rules.contains(&"maintenance_window".to_string()));
}

#[test]
fn window_downgrade_chains_step_exactly_once() {
    let mut cfg = config();
    cfg.maintenance_window = Some((0, 23));

    let cases = [
        (StrategyMode::Enforce, StrategyMode::Canary),
        (StrategyMode::Canary, StrategyMode::Suggest),
        (StrategyMode::Suggest, StrategyMode::Observe),
        (StrategyMode::Aggressive, StrategyMode::Balanced),
        (StrategyMode::Balanced, StrategyMode::Conservative),
        (StrategyMode::Conservative, StrategyMode::Suggest),
    ];
    for (desired, expected) in cases {
        let decision = decide_strategy(desired, 3, &[], &cfg, 12);
        assert_eq!(decision.strategy, expected, "downgrade of {desired:?}");
    }

    // Observe has nowhere softer to go; the rule does not apply.
    let observe = decide_strategy(StrategyMode::Observe, 3, &[], &cfg, 12);
    assert_eq!(observe.strategy, StrategyMode::Observe);
    assert!(!observe.applied_rules.contains(&"maintenance_window".to_string()));
}

#[test]
fn window_membership_wraps_overnight() {
    assert!(window_contains((22, 6), 23));
    assert!(window_contains((22, 6), 22));
    assert!(window_contains((22, 6), 3));
    assert!(window_contains((22, 6), 6));
    assert!(!window_contains((22, 6), 7));
    assert!(!window_contains((22, 6), 21));

    assert!(window_contains((9, 17), 12));
    assert!(!window_contains((9, 17), 8));
}

#[test]
fn maintenance_window_parsing_rejects_malformed_input() {
    assert_eq!(parse_maintenance_window("22,6"), Some((22, 6)));
    assert_eq!(parse_maintenance_window(" 9 , 17 "), Some((9, 17)));
    assert_eq!(parse_maintenance_window("25,6"), None);
    assert_eq!(parse_maintenance_window("22"), None);
    assert_eq!(parse_maintenance_window("a,b"), None);
}

#[test]
fn hours_outside_the_window_leave_the_strategy_alone() {
    let mut cfg = config();
    cfg.maintenance_window = Some((22, 6));
    let decision = decide_strategy(StrategyMode::Enforce, 3, &labels(&["web"]), &cfg, 12);
    assert_eq!(decision.strategy, StrategyMode::Enforce);
    assert!(!decision.applied_rules.contains(&"maintenance_window".to_string()));
}

// ============================================================================
// SECTION: Canary Sizing and TTL
// ============================================================================

#[test]
fn canary_size_is_bounded_by_targets_and_budget() {
    let cfg = config();
    let few_targets = decide_strategy(StrategyMode::Canary, 2, &[], &cfg, 12);
    assert_eq!(few_targets.canary_size, 2);

    let many_targets = decide_strategy(StrategyMode::Canary, 50, &[], &cfg, 12);
    assert_eq!(many_targets.canary_size, 5);
}

#[test]
fn enforce_with_zero_targets_downgrades_to_suggest() {
    let cfg = config();
    let decision = decide_strategy(StrategyMode::Enforce, 0, &[], &cfg, 12);
    assert_eq!(decision.strategy, StrategyMode::Suggest);
    assert!(decision.applied_rules.contains(&"canary_size_zero".to_string()));
}

#[test]
fn ttl_rule_always_applies_with_the_configured_value() {
    let mut cfg = config();
    cfg.default_ttl_seconds = 120;
    let decision = decide_strategy(StrategyMode::Observe, 0, &[], &cfg, 12);
    assert_eq!(decision.ttl_seconds, 120);
    assert!(decision.applied_rules.contains(&"default_ttl".to_string()));
    assert_eq!(decision.reasons.len(), decision.applied_rules.len());
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn identical_inputs_produce_identical_outputs_including_reason_order() {
    let mut cfg = config();
    cfg.maintenance_window = Some((22, 6));
    cfg.never_block_labels = vec!["production".to_string()];
    let host_labels = labels(&["production", "web"]);

    let first = decide_strategy(StrategyMode::Enforce, 3, &host_labels, &cfg, 23);
    let second = decide_strategy(StrategyMode::Enforce, 3, &host_labels, &cfg, 23);
    assert_eq!(first, second);
    // Window first, then the never-block cap, then ttl: rule order is fixed.
    assert_eq!(
        first.applied_rules,
        vec!["maintenance_window".to_string(), "default_ttl".to_string()]
    );
}
