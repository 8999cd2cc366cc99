// crates/aegisflux-correlator/src/lib.rs
// ============================================================================
// Module: AegisFlux Correlator Library
// Description: Rule engine over enriched events with temporal windows.
// Purpose: Match rules, deduplicate candidates, and emit findings.
// Dependencies: aegisflux-bus, aegisflux-core, arc-swap, lru, notify, tokio
// ============================================================================

//! ## Overview
//! The correlator consumes `events.enriched` (queue group `correlator`),
//! applies the active [`RuleSnapshot`](rules::RuleSnapshot) with runtime
//! overrides, buffers events in per-(rule, host) sliding windows, and emits
//! deduplicated findings on `correlator.findings`.
//! Invariants:
//! - Rule snapshots are all-or-nothing: readers see old-or-new, never a
//!   partial rule set.
//! - Within one (rule, host) pair events are evaluated in receive order; no
//!   cross-host ordering is promised.
//! - The dedup cache and finding store are bounded; oldest entries are
//!   evicted first.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dedup;
pub mod evaluator;
pub mod http;
pub mod metrics;
pub mod overrides;
pub mod publisher;
pub mod rules;
pub mod store;
pub mod window;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dedup::DedupCache;
pub use evaluator::CorrelatorEngine;
pub use metrics::CorrelatorMetrics;
pub use overrides::OverrideManager;
pub use overrides::OverrideRequest;
pub use overrides::RuleOverride;
pub use publisher::FindingPublisher;
pub use publisher::PublisherConfig;
pub use rules::loader::RuleLoader;
pub use rules::model::CompiledRule;
pub use rules::model::Rule;
pub use rules::model::RuleSnapshot;
pub use store::FindingStore;
pub use window::WindowBuffer;
pub use window::WindowEntry;
