// crates/aegisflux-decision/src/guardrails.rs
// ============================================================================
// Module: Guardrails
// Description: Pure strategy decider with priority-ordered downgrade rules.
// Purpose: Map a desired strategy to a safe final strategy under config.
// Dependencies: aegisflux-config, aegisflux-core
// ============================================================================

//! ## Overview
//! [`decide_strategy`] is a pure function of its inputs: same desired mode,
//! target count, labels, config, and hour always produce identical output,
//! including the order of `reasons`. Rules apply in a fixed order:
//!
//!   R1 maintenance window downgrade (overnight wrap allowed),
//!   R2 never-block label cap to canary,
//!   R3 canary sizing with the `canary_size_zero` downgrade,
//!   R4 ttl emission.
//!
//! The function never returns an error and never leaves the closed
//! [`StrategyMode`] set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aegisflux_config::ConfigSnapshot;
use aegisflux_core::GuardrailDecision;
use aegisflux_core::StrategyMode;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Environment variable naming the maintenance window as `"start,end"` in
/// 24-hour form (UTC).
pub const MAINTENANCE_WINDOW_ENV: &str = "DECISION_MAINTENANCE_WINDOW";

/// Inputs the guardrails read from configuration.
///
/// # Invariants
/// - `maintenance_window` hours are within `0 ..= 23`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailsConfig {
    /// Active-hours window `(start, end)`, inclusive, wrapping overnight.
    pub maintenance_window: Option<(u8, u8)>,
    /// Labels that forbid enforcement modes.
    pub never_block_labels: Vec<String>,
    /// Upper bound on canary subset size.
    pub max_canary_hosts: u32,
    /// Plan lifetime in seconds.
    pub default_ttl_seconds: u64,
}

impl GuardrailsConfig {
    /// Builds the config from the live snapshot plus the maintenance-window
    /// environment variable.
    #[must_use]
    pub fn load(snapshot: &ConfigSnapshot) -> Self {
        let maintenance_window = std::env::var(MAINTENANCE_WINDOW_ENV)
            .ok()
            .and_then(|raw| parse_maintenance_window(&raw));
        Self {
            maintenance_window,
            never_block_labels: snapshot.never_block_labels.clone(),
            max_canary_hosts: snapshot.max_canary_hosts,
            default_ttl_seconds: snapshot.default_ttl_seconds,
        }
    }
}

/// Parses `"start,end"` in 24-hour form; `None` for malformed input.
#[must_use]
pub fn parse_maintenance_window(raw: &str) -> Option<(u8, u8)> {
    let (start, end) = raw.split_once(',')?;
    let start: u8 = start.trim().parse().ok()?;
    let end: u8 = end.trim().parse().ok()?;
    (start <= 23 && end <= 23).then_some((start, end))
}

/// Returns true when `hour` falls inside the window, wrapping overnight
/// ranges such as `(22, 6)`.
#[must_use]
pub const fn window_contains(window: (u8, u8), hour: u8) -> bool {
    let (start, end) = window;
    if start <= end { hour >= start && hour <= end } else { hour >= start || hour <= end }
}

// ============================================================================
// SECTION: Downgrade Chains
// ============================================================================

/// One maintenance-window downgrade step.
const fn maintenance_downgrade(mode: StrategyMode) -> StrategyMode {
    match mode {
        StrategyMode::Enforce => StrategyMode::Canary,
        StrategyMode::Canary => StrategyMode::Suggest,
        StrategyMode::Suggest | StrategyMode::Observe => StrategyMode::Observe,
        StrategyMode::Aggressive => StrategyMode::Balanced,
        StrategyMode::Balanced => StrategyMode::Conservative,
        StrategyMode::Conservative => StrategyMode::Suggest,
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Decides the final strategy for a rollout.
///
/// Pure: reads no clock and no environment; callers pass `current_hour`
/// (UTC) and a materialized [`GuardrailsConfig`].
#[must_use]
pub fn decide_strategy(
    desired: StrategyMode,
    num_targets: u32,
    host_labels: &[String],
    config: &GuardrailsConfig,
    current_hour: u8,
) -> GuardrailDecision {
    let mut strategy = desired;
    let mut canary_size = 0u32;
    let mut reasons = Vec::new();
    let mut applied_rules = Vec::new();

    // R1: maintenance window downgrade.
    if let Some(window) = config.maintenance_window
        && window_contains(window, current_hour)
    {
        let downgraded = maintenance_downgrade(strategy);
        if downgraded != strategy {
            reasons.push(format!(
                "maintenance window {:02}:00-{:02}:59 active, downgraded {} to {}",
                window.0,
                window.1,
                strategy.as_str(),
                downgraded.as_str()
            ));
            applied_rules.push("maintenance_window".to_string());
            strategy = downgraded;
        }
    }

    // R2: never-block labels cap enforcement modes at canary.
    if strategy.is_enforcing()
        && let Some((host_label, blocked_label)) =
            never_block_match(host_labels, &config.never_block_labels)
    {
        reasons.push(format!(
            "host label {host_label} matches never-block label {blocked_label}, capped {} to canary",
            strategy.as_str()
        ));
        applied_rules.push("never_block_labels".to_string());
        strategy = StrategyMode::Canary;
    }

    // R3: canary sizing; zero capacity forces suggest.
    let potential = num_targets.min(config.max_canary_hosts);
    match strategy {
        StrategyMode::Canary => {
            if potential == 0 {
                reasons.push("canary size resolved to zero, downgraded to suggest".to_string());
                applied_rules.push("canary_size_zero".to_string());
                strategy = StrategyMode::Suggest;
            } else {
                canary_size = potential;
            }
        }
        StrategyMode::Enforce if potential == 0 => {
            reasons.push("no eligible targets for enforcement, downgraded to suggest".to_string());
            applied_rules.push("canary_size_zero".to_string());
            strategy = StrategyMode::Suggest;
        }
        _ => {}
    }

    // R4: ttl from live config.
    let ttl_seconds = config.default_ttl_seconds;
    reasons.push(format!("ttl {ttl_seconds}s applied from configuration"));
    applied_rules.push("default_ttl".to_string());

    GuardrailDecision {
        strategy,
        canary_size,
        ttl_seconds,
        reasons,
        applied_rules,
    }
}

/// Finds the first (host label, never-block label) containment pair,
/// case-insensitively in either direction.
fn never_block_match(
    host_labels: &[String],
    never_block: &[String],
) -> Option<(String, String)> {
    for host_label in host_labels {
        let host_lower = host_label.to_ascii_lowercase();
        for blocked in never_block {
            let blocked_lower = blocked.to_ascii_lowercase();
            if host_lower.contains(&blocked_lower) || blocked_lower.contains(&host_lower) {
                return Some((host_label.clone(), blocked.clone()));
            }
        }
    }
    None
}
