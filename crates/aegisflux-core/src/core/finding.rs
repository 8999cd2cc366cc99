// crates/aegisflux-core/src/core/finding.rs
// ============================================================================
// Module: AegisFlux Findings
// Description: Rule-matched, deduplicated records derived from enriched events.
// Purpose: Provide the finding record and its evidence envelope.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Finding`] is what the correlator emits when a rule's temporal
//! condition reduces to true for a host. Evidence travels as a list of
//! opaque JSON values inside a schema-versioned [`EvidenceEnvelope`] rather
//! than a free-form map, so consumers can evolve their readers against an
//! explicit version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::FindingId;
use crate::core::identifiers::HostId;
use crate::core::identifiers::RuleId;
use crate::error::CoreError;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Closed severity set, ordered least to most severe.
///
/// # Invariants
/// - Variants are stable for serialization and override validation.
/// - Declaration order defines the `Ord` ranking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational or low-impact findings.
    Low,
    /// Findings worth triaging.
    Medium,
    /// Findings needing prompt attention.
    High,
    /// Findings needing immediate response.
    Critical,
}

impl Severity {
    /// Returns the stable wire label for the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::InvalidInput(format!("unknown severity: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Finding Status
// ============================================================================

/// Lifecycle status of a finding in the correlator store.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    /// Newly emitted, eligible for planning.
    Open,
    /// An operator has acknowledged the finding.
    Acknowledged,
    /// The finding has been resolved or superseded.
    Resolved,
}

// ============================================================================
// SECTION: Evidence Envelope
// ============================================================================

/// Current evidence envelope schema version.
pub const EVIDENCE_SCHEMA_VERSION: u32 = 1;

/// Schema-versioned list of opaque evidence values.
///
/// # Invariants
/// - `items` are opaque JSON values; the correlator never interprets them
///   beyond digesting the first item for dedup keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEnvelope {
    /// Envelope schema version.
    pub schema_version: u32,
    /// Opaque evidence values, most significant first.
    pub items: Vec<Value>,
}

impl EvidenceEnvelope {
    /// Creates an envelope at the current schema version.
    #[must_use]
    pub const fn new(items: Vec<Value>) -> Self {
        Self {
            schema_version: EVIDENCE_SCHEMA_VERSION,
            items,
        }
    }

    /// Returns the primary (first) evidence item when present.
    #[must_use]
    pub fn primary(&self) -> Option<&Value> {
        self.items.first()
    }
}

impl Default for EvidenceEnvelope {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

// ============================================================================
// SECTION: Finding Record
// ============================================================================

/// A rule-matched, deduplicated record eligible for planning.
///
/// # Invariants
/// - `id` is derived from host, rule, and dedup bucket; identical candidates
///   within a bucket share an id and are dropped by the dedup cache.
/// - `confidence` is within `[0, 1]`.
/// - `ttl_seconds` is the finding's advertised lifetime; zero means the
///   emitter declared no lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Finding identifier.
    pub id: FindingId,
    /// Severity after overrides were applied.
    pub severity: Severity,
    /// Confidence in `[0, 1]` after overrides were applied.
    pub confidence: f64,
    /// Lifecycle status.
    pub status: FindingStatus,
    /// Host the finding refers to.
    pub host_id: HostId,
    /// Related CVE identifier, when enrichment supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    /// Evidence captured from the matching window.
    pub evidence: EvidenceEnvelope,
    /// Emission time as unix milliseconds.
    pub timestamp: i64,
    /// Rule that produced the finding.
    pub rule_id: RuleId,
    /// Advertised lifetime in seconds.
    pub ttl_seconds: u64,
    /// Correlation identifier threading the finding to downstream plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    /// Tags copied from the rule outcome.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Finding {
    /// Returns true when any evidence item's string form contains the
    /// needle, case-insensitively.
    #[must_use]
    pub fn evidence_contains(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.evidence.items.iter().any(|item| {
            let rendered = match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            rendered.to_ascii_lowercase().contains(&needle)
        })
    }
}
