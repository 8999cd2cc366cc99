// crates/aegisflux-bus/src/subject.rs
// ============================================================================
// Module: Bus Subjects
// Description: Canonical subject names and wildcard matching.
// Purpose: Keep subject strings and their matching rules in one place.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Subjects are dot-separated token paths. A `*` token matches exactly one
//! token; a trailing `>` matches one or more remaining tokens. Matching is
//! used by [`MemoryBus`](crate::MemoryBus); the production client delegates
//! matching to the server with identical semantics.

// ============================================================================
// SECTION: Subject Constants
// ============================================================================

/// Validated raw events published by ingest.
pub const EVENTS_RAW: &str = "events.raw";

/// Enriched events consumed by the correlator.
pub const EVENTS_ENRICHED: &str = "events.enriched";

/// Findings emitted by the correlator.
pub const CORRELATOR_FINDINGS: &str = "correlator.findings";

/// Plan lifecycle: stored.
pub const PLANS_CREATED: &str = "plans.created";

/// Plan lifecycle: updated.
pub const PLANS_UPDATED: &str = "plans.updated";

/// Plan lifecycle: deleted.
pub const PLANS_DELETED: &str = "plans.deleted";

/// Plans proposed for operator review.
pub const PLANS_PROPOSED: &str = "plans.proposed";

/// Live configuration changes.
pub const CONFIG_CHANGED: &str = "config.changed";

/// Queue group for correlator instances on `events.enriched`.
pub const QUEUE_CORRELATOR: &str = "correlator";

/// Queue group for decision instances on `correlator.findings`.
pub const QUEUE_DECISION: &str = "decision";

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Returns true when a subject matches a subscription pattern.
#[must_use]
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');
    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (None, None) => return true,
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            _ => return false,
        }
    }
}
