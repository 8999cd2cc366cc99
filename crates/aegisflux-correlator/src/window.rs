// crates/aegisflux-correlator/src/window.rs
// ============================================================================
// Module: Window Buffer
// Description: Per-(rule, host) sliding-window event buffers.
// Purpose: Hold live window entries for temporal matching with cheap appends.
// Dependencies: aegisflux-core, parking_lot, serde_json
// ============================================================================

//! ## Overview
//! The buffer maps `(rule_id, host_id)` to a time-ordered queue of
//! [`WindowEntry`] values. Inserts append in O(1) under the bucket's own
//! mutex; a global lock covers only bucket creation. The sweeper evicts
//! entries whose `window_end` fell behind `now - grace`, where grace is the
//! largest rule window in the active snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use aegisflux_core::HostId;
use aegisflux_core::RuleId;
use parking_lot::Mutex;
use parking_lot::RwLock;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Interval between sweeper passes.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Bucket key for one (rule, host) pair.
type BucketKey = (RuleId, HostId);

/// One buffered event reference inside a rule window.
///
/// # Invariants
/// - `window_end = window_start + window duration` at insert time.
/// - Entries in a bucket are ordered by `window_end` (insert order, since
///   all entries of a bucket share one duration).
#[derive(Debug, Clone)]
pub struct WindowEntry {
    /// Event rendered as JSON at receive time.
    pub event: Arc<Value>,
    /// Event timestamp (unix milliseconds).
    pub window_start: i64,
    /// End of the window opened by this event (unix milliseconds).
    pub window_end: i64,
}

// ============================================================================
// SECTION: Buffer
// ============================================================================

/// Thread-safe per-bucket window buffer.
///
/// # Invariants
/// - One mutex per bucket; the outer lock guards only bucket creation and
///   enumeration.
#[derive(Default)]
pub struct WindowBuffer {
    /// Buckets keyed by (rule, host).
    buckets: RwLock<HashMap<BucketKey, Arc<Mutex<VecDeque<WindowEntry>>>>>,
}

impl WindowBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the bucket for a key, creating it when absent.
    fn bucket(&self, key: &BucketKey) -> Arc<Mutex<VecDeque<WindowEntry>>> {
        if let Some(bucket) = self.buckets.read().get(key) {
            return Arc::clone(bucket);
        }
        let mut buckets = self.buckets.write();
        Arc::clone(buckets.entry(key.clone()).or_default())
    }

    /// Appends an event to the (rule, host) bucket.
    pub fn insert(
        &self,
        rule_id: &RuleId,
        host_id: &HostId,
        event: Arc<Value>,
        event_ts: i64,
        window_seconds: u64,
    ) {
        let window_ms = i64::try_from(window_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        let entry = WindowEntry {
            event,
            window_start: event_ts,
            window_end: event_ts.saturating_add(window_ms),
        };
        let bucket = self.bucket(&(rule_id.clone(), host_id.clone()));
        bucket.lock().push_back(entry);
    }

    /// Returns the entries whose windows are still open at `now`.
    #[must_use]
    pub fn live(&self, rule_id: &RuleId, host_id: &HostId, now: i64) -> Vec<WindowEntry> {
        let key = (rule_id.clone(), host_id.clone());
        let Some(bucket) = self.buckets.read().get(&key).map(Arc::clone) else {
            return Vec::new();
        };
        let entries = bucket.lock();
        entries.iter().filter(|entry| entry.window_end >= now).cloned().collect()
    }

    /// Evicts entries whose `window_end` is strictly before `now - grace`.
    ///
    /// Returns the number of evicted entries. Empty buckets are dropped so
    /// departed hosts do not leak memory.
    pub fn sweep(&self, now: i64, grace_seconds: u64) -> usize {
        let grace_ms = i64::try_from(grace_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        let horizon = now.saturating_sub(grace_ms);
        let keys: Vec<BucketKey> = self.buckets.read().keys().cloned().collect();
        let mut evicted = 0;
        for key in keys {
            let Some(bucket) = self.buckets.read().get(&key).map(Arc::clone) else {
                continue;
            };
            let emptied = {
                let mut entries = bucket.lock();
                let before = entries.len();
                while entries.front().is_some_and(|entry| entry.window_end < horizon) {
                    entries.pop_front();
                }
                evicted += before - entries.len();
                entries.is_empty()
            };
            if emptied {
                let mut buckets = self.buckets.write();
                // Re-check under the index lock: an insert may have raced in.
                if buckets.get(&key).is_some_and(|current| current.lock().is_empty()) {
                    buckets.remove(&key);
                }
            }
        }
        evicted
    }

    /// Returns the total number of buffered entries across buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        let buckets: Vec<Arc<Mutex<VecDeque<WindowEntry>>>> =
            self.buckets.read().values().map(Arc::clone).collect();
        buckets.iter().map(|bucket| bucket.lock().len()).sum()
    }

    /// Returns true when no entries are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
