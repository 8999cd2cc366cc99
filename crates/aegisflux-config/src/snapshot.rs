// crates/aegisflux-config/src/snapshot.rs
// ============================================================================
// Module: Config Snapshot
// Description: Typed configuration keys and immutable snapshots.
// Purpose: Parse entries and changes into a coherent snapshot value.
// Dependencies: aegisflux-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ConfigSnapshot`] holds the typed values of the recognized keys plus
//! `last_updated`. Snapshots are immutable; the manager replaces the pointer
//! on change. Unknown keys are ignored so newer producers never break older
//! consumers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use aegisflux_core::StrategyMode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Recognized Keys
// ============================================================================

/// Desired decision mode when no reasoner proposes one.
pub const KEY_DECISION_MODE: &str = "decision.mode";

/// Upper bound on canary subset size.
pub const KEY_MAX_CANARY_HOSTS: &str = "decision.max_canary_hosts";

/// Default plan lifetime in seconds.
pub const KEY_DEFAULT_TTL_SECONDS: &str = "decision.default_ttl_seconds";

/// Labels that forbid enforcement modes.
pub const KEY_NEVER_BLOCK_LABELS: &str = "guardrails.never_block_labels";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// One typed entry returned by `GET /config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Dotted configuration key.
    pub key: String,
    /// Raw JSON value for the key.
    pub value: Value,
}

/// A live change published on `config.changed`.
///
/// # Invariants
/// - `timestamp` is unix seconds, as published by the config API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChange {
    /// Dotted configuration key.
    pub key: String,
    /// Raw JSON value for the key.
    pub value: Value,
    /// Scope the change applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Principal that made the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Change time as unix seconds.
    pub timestamp: i64,
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable snapshot of the recognized configuration keys.
///
/// # Invariants
/// - Instances are never mutated after publication; apply paths build a new
///   snapshot from the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Desired decision mode (`decision.mode`).
    pub decision_mode: StrategyMode,
    /// Canary subset bound (`decision.max_canary_hosts`).
    pub max_canary_hosts: u32,
    /// Default plan lifetime (`decision.default_ttl_seconds`).
    pub default_ttl_seconds: u64,
    /// Never-block labels (`guardrails.never_block_labels`).
    pub never_block_labels: Vec<String>,
    /// Unix-second time of the last applied change; zero at bootstrap.
    pub last_updated: i64,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            decision_mode: StrategyMode::Suggest,
            max_canary_hosts: 5,
            default_ttl_seconds: 3600,
            never_block_labels: vec!["role:db".to_string(), "role:control-plane".to_string()],
            last_updated: 0,
        }
    }
}

impl ConfigSnapshot {
    /// Builds the env-derived default snapshot used when the initial fetch
    /// fails.
    #[must_use]
    pub fn from_env() -> Self {
        let mut snapshot = Self::default();
        if let Ok(raw) = std::env::var("DECISION_MAX_CANARY_HOSTS")
            && let Ok(value) = raw.trim().parse::<u32>()
        {
            snapshot.max_canary_hosts = value;
        }
        if let Ok(raw) = std::env::var("DECISION_DEFAULT_TTL_SECONDS")
            && let Ok(value) = raw.trim().parse::<u64>()
        {
            snapshot.default_ttl_seconds = value;
        }
        if let Ok(raw) = std::env::var("DECISION_NEVER_BLOCK_LABELS") {
            let labels: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(ToString::to_string)
                .collect();
            if !labels.is_empty() {
                snapshot.never_block_labels = labels;
            }
        }
        snapshot
    }

    /// Builds a snapshot from defaults plus fetched entries.
    #[must_use]
    pub fn from_entries(entries: &[ConfigEntry]) -> Self {
        let mut snapshot = Self::default();
        for entry in entries {
            snapshot.apply_value(&entry.key, &entry.value);
        }
        snapshot
    }

    /// Returns a new snapshot with one change applied.
    ///
    /// Unknown keys and malformed values leave the snapshot unchanged apart
    /// from `last_updated`, so a bad producer cannot wedge consumers.
    #[must_use]
    pub fn with_change(&self, change: &ConfigChange) -> Self {
        let mut next = self.clone();
        let applied = next.apply_value(&change.key, &change.value);
        if !applied {
            tracing::warn!(key = %change.key, "ignoring unrecognized or malformed config change");
        }
        next.last_updated = change.timestamp;
        next
    }

    /// Applies one key/value pair in place; returns true when recognized
    /// and well-formed.
    fn apply_value(&mut self, key: &str, value: &Value) -> bool {
        match key {
            KEY_DECISION_MODE => value
                .as_str()
                .and_then(|raw| StrategyMode::from_str(raw).ok())
                .map(|mode| self.decision_mode = mode)
                .is_some(),
            KEY_MAX_CANARY_HOSTS => value
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .map(|hosts| self.max_canary_hosts = hosts)
                .is_some(),
            KEY_DEFAULT_TTL_SECONDS => {
                value.as_u64().map(|ttl| self.default_ttl_seconds = ttl).is_some()
            }
            KEY_NEVER_BLOCK_LABELS => parse_labels(value)
                .map(|labels| self.never_block_labels = labels)
                .is_some(),
            _ => false,
        }
    }
}

/// Parses never-block labels from either a JSON array or a comma string.
fn parse_labels(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => {
            let labels: Vec<String> =
                items.iter().filter_map(Value::as_str).map(ToString::to_string).collect();
            (labels.len() == items.len()).then_some(labels)
        }
        Value::String(raw) => Some(
            raw.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(ToString::to_string)
                .collect(),
        ),
        _ => None,
    }
}
