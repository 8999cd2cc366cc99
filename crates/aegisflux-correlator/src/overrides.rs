// crates/aegisflux-correlator/src/overrides.rs
// ============================================================================
// Module: Rule Overrides
// Description: Runtime rule-parameter overrides with TTL expiry.
// Purpose: Let operators adjust rules without touching rule files.
// Dependencies: aegisflux-core, parking_lot, serde, tokio
// ============================================================================

//! ## Overview
//! An override targets a `rule_id` and may replace `enabled`, `severity`,
//! `confidence`, or the outcome `ttl_seconds`. Overrides are keyed by a
//! minted id, expire after their own lifetime, and are swept periodically.
//! Removal is idempotent. When several live overrides target one rule, the
//! most recently added wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aegisflux_core::CoreError;
use aegisflux_core::OverrideId;
use aegisflux_core::RuleId;
use aegisflux_core::Severity;
use aegisflux_core::core::time::now_unix_millis;
use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Override lifetime when a request omits one.
pub const DEFAULT_OVERRIDE_LIFETIME_SECONDS: u64 = 3600;

/// Interval between sweeper passes.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Request body for adding an override.
///
/// # Invariants
/// - At least one overridden field should be present for the override to
///   have any effect; an empty override is accepted but inert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// Rule the override targets.
    pub rule_id: RuleId,
    /// Replacement for the rule's enabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replacement severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Replacement confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Replacement finding ttl in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    /// Override lifetime in seconds; defaults to
    /// [`DEFAULT_OVERRIDE_LIFETIME_SECONDS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<u64>,
}

/// A stored override with its expiry.
///
/// # Invariants
/// - `expires_at` is absolute unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOverride {
    /// Override identifier minted at add time.
    pub id: OverrideId,
    /// Rule the override targets.
    pub rule_id: RuleId,
    /// Replacement for the rule's enabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replacement severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Replacement confidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Replacement finding ttl in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    /// Creation time as unix milliseconds.
    pub created_at: i64,
    /// Expiry time as unix milliseconds.
    pub expires_at: i64,
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// In-memory override registry with TTL expiry.
#[derive(Default)]
pub struct OverrideManager {
    /// Stored overrides keyed by minted id.
    inner: RwLock<HashMap<OverrideId, RuleOverride>>,
}

impl OverrideManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Validates and stores an override, returning the minted record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when `confidence` is outside
    /// `[0, 1]`. Severity and ttl are validated by their types at the wire.
    pub fn add(&self, request: OverrideRequest) -> Result<RuleOverride, CoreError> {
        if let Some(confidence) = request.confidence
            && !(0.0 ..= 1.0).contains(&confidence)
        {
            return Err(CoreError::InvalidInput(format!(
                "override confidence {confidence} outside [0, 1]"
            )));
        }
        if request.rule_id.as_str().is_empty() {
            return Err(CoreError::InvalidInput("override rule_id must not be empty".to_string()));
        }
        let now = now_unix_millis();
        let lifetime = request.expires_in_seconds.unwrap_or(DEFAULT_OVERRIDE_LIFETIME_SECONDS);
        let record = RuleOverride {
            id: OverrideId::random(),
            rule_id: request.rule_id,
            enabled: request.enabled,
            severity: request.severity,
            confidence: request.confidence,
            ttl_seconds: request.ttl_seconds,
            created_at: now,
            expires_at: now.saturating_add(i64::try_from(lifetime.saturating_mul(1000)).unwrap_or(i64::MAX)),
        };
        self.inner.write().insert(record.id.clone(), record.clone());
        Ok(record)
    }

    /// Removes an override by id; idempotent.
    ///
    /// Returns true when a record was actually removed.
    pub fn remove(&self, id: &OverrideId) -> bool {
        self.inner.write().remove(id).is_some()
    }

    /// Returns the live override for a rule, latest added wins.
    #[must_use]
    pub fn effective_for(&self, rule_id: &RuleId, now: i64) -> Option<RuleOverride> {
        self.inner
            .read()
            .values()
            .filter(|record| &record.rule_id == rule_id && record.expires_at > now)
            .max_by_key(|record| record.created_at)
            .cloned()
    }

    /// Lists live overrides.
    #[must_use]
    pub fn list(&self, now: i64) -> Vec<RuleOverride> {
        let mut records: Vec<RuleOverride> =
            self.inner.read().values().filter(|record| record.expires_at > now).cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    /// Drops expired overrides; returns how many were removed.
    pub fn sweep(&self, now: i64) -> usize {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|_, record| record.expires_at > now);
        before - inner.len()
    }

    /// Periodically sweeps expired overrides until the task is aborted.
    pub async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = self.sweep(now_unix_millis());
            if removed > 0 {
                tracing::debug!(removed, "expired rule overrides swept");
            }
        }
    }
}
