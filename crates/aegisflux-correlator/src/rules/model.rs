// crates/aegisflux-correlator/src/rules/model.rs
// ============================================================================
// Module: Rule Model
// Description: Rule records, selectors, temporal conditions, and snapshots.
// Purpose: Validate rules at load time and expose immutable snapshots.
// Dependencies: aegisflux-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Rule`] couples selectors (which hosts/events it applies to), a
//! temporal [`Condition`] (window, count, inter-event intervals, time
//! masks, field predicate), and an [`Outcome`] (severity, confidence, tags,
//! ttl). Validation happens once at load; the hot path only evaluates
//! compiled forms.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use aegisflux_core::CoreError;
use aegisflux_core::EnrichedEvent;
use aegisflux_core::RuleId;
use aegisflux_core::Severity;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::rules::predicate::CompiledPredicate;

// ============================================================================
// SECTION: Selectors
// ============================================================================

/// Host and context selectors for a rule.
///
/// # Invariants
/// - Empty lists match everything for their dimension.
/// - `exclude_host_ids` always wins over inclusion.
/// - Label selection intersects: any shared label matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    /// Literal host identifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_ids: Vec<String>,
    /// Glob patterns over host identifiers (`*` wildcard).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_patterns: Vec<String>,
    /// Environments accepted from event context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,
    /// Services accepted from event context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    /// Regions accepted from event context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    /// Labels accepted from event context (intersection semantics).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Hosts excluded regardless of other selectors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_host_ids: Vec<String>,
}

impl Selectors {
    /// Returns true when the selectors admit the event.
    #[must_use]
    pub fn matches(&self, event: &EnrichedEvent) -> bool {
        let host = event.host_id.as_str();
        if self.exclude_host_ids.iter().any(|excluded| excluded == host) {
            return false;
        }
        if !self.host_ids.is_empty() || !self.host_patterns.is_empty() {
            let listed = self.host_ids.iter().any(|id| id == host);
            let patterned = self.host_patterns.iter().any(|pattern| glob_match(pattern, host));
            if !listed && !patterned {
                return false;
            }
        }
        if !context_admits(&self.environments, event.context_str("environment")) {
            return false;
        }
        if !context_admits(&self.services, event.context_str("service")) {
            return false;
        }
        if !context_admits(&self.regions, event.context_str("region")) {
            return false;
        }
        if !self.labels.is_empty() {
            let event_labels = event
                .context
                .get("labels")
                .and_then(Value::as_array)
                .map(|items| {
                    items.iter().filter_map(Value::as_str).map(ToString::to_string).collect::<Vec<_>>()
                })
                .unwrap_or_default();
            if !self.labels.iter().any(|label| event_labels.iter().any(|have| have == label)) {
                return false;
            }
        }
        true
    }
}

/// Returns true when a non-empty selector list admits the context value.
fn context_admits(selector: &[String], value: Option<&str>) -> bool {
    if selector.is_empty() {
        return true;
    }
    value.is_some_and(|value| selector.iter().any(|allowed| allowed == value))
}

/// Matches a `*`-wildcard glob against a candidate string.
#[must_use]
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == candidate;
    }
    let last = segments.len() - 1;
    let mut remainder = candidate;
    for (index, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if index == 0 {
            let Some(rest) = remainder.strip_prefix(segment) else {
                return false;
            };
            remainder = rest;
        } else if index == last {
            let Some(rest) = remainder.strip_suffix(segment) else {
                return false;
            };
            remainder = rest;
        } else {
            let Some(position) = remainder.find(segment) else {
                return false;
            };
            remainder = &remainder[position + segment.len() ..];
        }
    }
    true
}

// ============================================================================
// SECTION: Temporal Condition
// ============================================================================

/// Window kind for temporal matching.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    /// Window advances continuously with each event.
    Sliding,
    /// Window advances in whole-duration steps.
    Tumbling,
    /// Window advances by `step_seconds` with overlap.
    Hopping,
}

/// Temporal window specification.
///
/// # Invariants
/// - `duration_seconds` is strictly positive.
/// - `step_seconds` never exceeds `duration_seconds`; zero means "equal to
///   the duration".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Window length in seconds.
    pub duration_seconds: u64,
    /// Step in seconds for tumbling/hopping windows.
    #[serde(default)]
    pub step_seconds: u64,
    /// True when adjacent windows may overlap.
    #[serde(default)]
    pub overlap: bool,
    /// Window kind.
    #[serde(rename = "type", default = "default_window_type")]
    pub window_type: WindowType,
}

/// Default window kind when a rule file omits it.
const fn default_window_type() -> WindowType {
    WindowType::Sliding
}

/// Inclusive hour-of-day range; overnight wrap is allowed.
///
/// # Invariants
/// - Hours are in `0 ..= 23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    /// Starting hour, inclusive.
    pub start_hour: u8,
    /// Ending hour, inclusive.
    pub end_hour: u8,
}

impl HourRange {
    /// Returns true when the hour falls inside the range, wrapping overnight
    /// ranges such as `22..=6`.
    #[must_use]
    pub const fn contains(self, hour: u8) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour <= self.end_hour
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        }
    }
}

/// Temporal condition a rule evaluates over its window.
///
/// # Invariants
/// - `min_count >= 1`.
/// - Interval bounds apply to consecutive matched events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Temporal window specification.
    pub window: WindowSpec,
    /// Minimum number of matching events inside the window.
    #[serde(default = "default_min_count")]
    pub min_count: u32,
    /// Hour-of-day mask, when the rule is time-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<HourRange>,
    /// Day-of-week mask (0 = Sunday .. 6 = Saturday).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    /// Minimum seconds between consecutive matched events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval_seconds: Option<u64>,
    /// Maximum seconds between consecutive matched events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_interval_seconds: Option<u64>,
    /// Field predicate mapping; keys are dotted event paths.
    #[serde(default, rename = "where", skip_serializing_if = "BTreeMap::is_empty")]
    pub where_clause: BTreeMap<String, Value>,
}

/// Default event count threshold.
const fn default_min_count() -> u32 {
    1
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Finding outcome template for a rule.
///
/// # Invariants
/// - `confidence` is within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Severity assigned to emitted findings.
    pub severity: Severity,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Finding title.
    pub title: String,
    /// Finding description.
    #[serde(default)]
    pub description: String,
    /// Tags copied onto findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Suggested response actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    /// Finding lifetime in seconds; also the dedup bucket size.
    #[serde(default)]
    pub ttl_seconds: u64,
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// A declarative correlation rule.
///
/// # Invariants
/// - `rule_id` is non-empty and unique within a snapshot.
/// - `condition.window.step_seconds <= condition.window.duration_seconds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Human-readable description of what the rule detects.
    #[serde(default)]
    pub description: String,
    /// False disables the rule without removing the file.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Host and context selectors.
    #[serde(default)]
    pub selectors: Selectors,
    /// Temporal condition.
    pub condition: Condition,
    /// Finding outcome template.
    pub outcome: Outcome,
}

/// Rules are enabled unless the file says otherwise.
const fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Validates load-time invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] naming the violated invariant.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.rule_id.as_str().is_empty() {
            return Err(CoreError::InvalidInput("rule_id must not be empty".to_string()));
        }
        if self.condition.window.duration_seconds == 0 {
            return Err(CoreError::InvalidInput(format!(
                "rule {}: window duration must be positive",
                self.rule_id
            )));
        }
        if self.condition.window.step_seconds > self.condition.window.duration_seconds {
            return Err(CoreError::InvalidInput(format!(
                "rule {}: window step {}s exceeds duration {}s",
                self.rule_id, self.condition.window.step_seconds, self.condition.window.duration_seconds
            )));
        }
        if !(0.0 ..= 1.0).contains(&self.outcome.confidence) {
            return Err(CoreError::InvalidInput(format!(
                "rule {}: confidence {} outside [0, 1]",
                self.rule_id, self.outcome.confidence
            )));
        }
        if self.condition.min_count == 0 {
            return Err(CoreError::InvalidInput(format!(
                "rule {}: min_count must be at least 1",
                self.rule_id
            )));
        }
        if let Some(range) = self.condition.time_of_day
            && (range.start_hour > 23 || range.end_hour > 23)
        {
            return Err(CoreError::InvalidInput(format!(
                "rule {}: time_of_day hours must be within 0..=23",
                self.rule_id
            )));
        }
        if let Some(days) = &self.condition.days_of_week
            && days.iter().any(|day| *day > 6)
        {
            return Err(CoreError::InvalidInput(format!(
                "rule {}: days_of_week entries must be within 0..=6",
                self.rule_id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Compiled Rule and Snapshot
// ============================================================================

/// A rule with its predicate compiled for the hot path.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// The validated rule as loaded.
    pub rule: Rule,
    /// Predicate compiled from the rule's `where` mapping.
    pub predicate: CompiledPredicate,
}

/// Immutable, ordered collection of compiled rules with a version token.
///
/// # Invariants
/// - Every contained rule validated at load time.
/// - Snapshots are swapped atomically; readers see old-or-new.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    /// Version token derived from the loaded file contents.
    pub version: String,
    /// Load time as unix milliseconds; zero for the empty bootstrap snapshot.
    pub loaded_at: i64,
    /// Compiled rules in file-name order.
    pub rules: Vec<Arc<CompiledRule>>,
}

impl RuleSnapshot {
    /// The empty snapshot services start with before the first load.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            version: String::new(),
            loaded_at: 0,
            rules: Vec::new(),
        }
    }

    /// Returns the largest window duration across the snapshot, used as the
    /// window-buffer eviction grace.
    #[must_use]
    pub fn max_window_seconds(&self) -> u64 {
        self.rules
            .iter()
            .map(|compiled| compiled.rule.condition.window.duration_seconds)
            .max()
            .unwrap_or(0)
    }
}
