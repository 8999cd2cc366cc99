// crates/aegisflux-correlator/src/metrics.rs
// ============================================================================
// Module: Correlator Metrics
// Description: Process-local counters surfaced as JSON.
// Purpose: Count pipeline activity without a metrics backend dependency.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Counters are plain atomics surfaced by `GET /metrics` as a JSON object.
//! The interface is intentionally dependency-light so deployments can plug
//! in a Prometheus or OpenTelemetry exporter without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Counters
// ============================================================================

/// Correlator pipeline counters.
#[derive(Debug, Default)]
pub struct CorrelatorMetrics {
    /// Enriched events consumed.
    events_processed_total: AtomicU64,
    /// Events dropped as undecodable or failing predicate evaluation.
    events_invalid_total: AtomicU64,
    /// Findings emitted (post-dedup).
    findings_emitted_total: AtomicU64,
    /// Candidate findings dropped by the dedup cache.
    findings_deduped_total: AtomicU64,
    /// Finding publishes that failed after retry exhaustion.
    publish_failures_total: AtomicU64,
}

impl CorrelatorMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one consumed event.
    pub fn inc_processed(&self) {
        self.events_processed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one invalid event.
    pub fn inc_invalid(&self) {
        self.events_invalid_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one emitted finding.
    pub fn inc_emitted(&self) {
        self.findings_emitted_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one deduplicated candidate.
    pub fn inc_deduped(&self) {
        self.findings_deduped_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one exhausted publish.
    pub fn inc_publish_failure(&self) {
        self.publish_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Captures the counters as a wire snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_processed_total: self.events_processed_total.load(Ordering::Relaxed),
            events_invalid_total: self.events_invalid_total.load(Ordering::Relaxed),
            findings_emitted_total: self.findings_emitted_total.load(Ordering::Relaxed),
            findings_deduped_total: self.findings_deduped_total.load(Ordering::Relaxed),
            publish_failures_total: self.publish_failures_total.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// SECTION: Wire Snapshot
// ============================================================================

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Enriched events consumed.
    pub events_processed_total: u64,
    /// Events dropped as undecodable or failing predicate evaluation.
    pub events_invalid_total: u64,
    /// Findings emitted (post-dedup).
    pub findings_emitted_total: u64,
    /// Candidate findings dropped by the dedup cache.
    pub findings_deduped_total: u64,
    /// Finding publishes that failed after retry exhaustion.
    pub publish_failures_total: u64,
}
