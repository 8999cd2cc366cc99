// crates/aegisflux-correlator/src/store.rs
// ============================================================================
// Module: Finding Store
// Description: Bounded in-memory ring of emitted findings.
// Purpose: Serve the findings query API with oldest-first eviction.
// Dependencies: aegisflux-core, parking_lot
// ============================================================================

//! ## Overview
//! Findings are kept in a ring bounded by `CORR_MAX_FINDINGS` (default
//! 10 000). When full, the oldest finding is evicted first. Queries return
//! newest-first and filter on host and minimum severity; reset clears the
//! ring.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

use aegisflux_core::Finding;
use aegisflux_core::Severity;
use parking_lot::Mutex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default ring capacity (`CORR_MAX_FINDINGS`).
pub const DEFAULT_MAX_FINDINGS: usize = 10_000;

/// Default query limit when the caller omits one.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Bounded ring of findings.
///
/// # Invariants
/// - Size never exceeds the configured capacity.
/// - Insertion order is emission order; eviction drops the oldest first.
pub struct FindingStore {
    /// Ring of findings in emission order.
    inner: Mutex<VecDeque<Finding>>,
    /// Maximum retained findings.
    capacity: usize,
}

impl FindingStore {
    /// Creates a store bounded by `capacity` (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Inserts a finding, returning the evicted record when the ring was
    /// full.
    pub fn push(&self, finding: Finding) -> Option<Finding> {
        let mut inner = self.inner.lock();
        let evicted = if inner.len() >= self.capacity { inner.pop_front() } else { None };
        inner.push_back(finding);
        evicted
    }

    /// Queries findings newest-first with optional filters.
    #[must_use]
    pub fn query(
        &self,
        host_id: Option<&str>,
        min_severity: Option<Severity>,
        limit: usize,
    ) -> Vec<Finding> {
        let inner = self.inner.lock();
        inner
            .iter()
            .rev()
            .filter(|finding| host_id.is_none_or(|host| finding.host_id.as_str() == host))
            .filter(|finding| min_severity.is_none_or(|severity| finding.severity >= severity))
            .take(limit.max(1))
            .cloned()
            .collect()
    }

    /// Clears the ring; returns how many findings were dropped.
    pub fn reset(&self) -> usize {
        let mut inner = self.inner.lock();
        let cleared = inner.len();
        inner.clear();
        cleared
    }

    /// Returns the number of retained findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true when no findings are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
