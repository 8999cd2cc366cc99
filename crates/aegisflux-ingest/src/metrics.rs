// crates/aegisflux-ingest/src/metrics.rs
// ============================================================================
// Module: Ingest Metrics
// Description: Process-local ingestion counters surfaced as JSON.
// Purpose: Count stream activity without a metrics backend dependency.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Plain atomic counters surfaced by the health HTTP surface. Deployments
//! that want scrape-based metrics plug an exporter in front of these
//! numbers.

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

/// Ingest stream counters.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// Events received from agent streams.
    events_received_total: AtomicU64,
    /// Events that passed schema validation.
    events_valid_total: AtomicU64,
    /// Events rejected by schema validation.
    events_invalid_total: AtomicU64,
    /// Events successfully published to `events.raw`.
    events_published_total: AtomicU64,
}

impl IngestMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one received event.
    pub fn inc_received(&self) {
        self.events_received_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one schema-valid event.
    pub fn inc_valid(&self) {
        self.events_valid_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one schema-rejected event.
    pub fn inc_invalid(&self) {
        self.events_invalid_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one published event.
    pub fn inc_published(&self) {
        self.events_published_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Captures the counters as a wire snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received_total: self.events_received_total.load(Ordering::Relaxed),
            events_valid_total: self.events_valid_total.load(Ordering::Relaxed),
            events_invalid_total: self.events_invalid_total.load(Ordering::Relaxed),
            events_published_total: self.events_published_total.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// SECTION: Wire Snapshot
// ============================================================================

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Events received from agent streams.
    pub events_received_total: u64,
    /// Events that passed schema validation.
    pub events_valid_total: u64,
    /// Events rejected by schema validation.
    pub events_invalid_total: u64,
    /// Events successfully published to `events.raw`.
    pub events_published_total: u64,
}
