// crates/aegisflux-correlator/src/dedup.rs
// ============================================================================
// Module: Dedup Cache
// Description: Bounded LRU of recently emitted finding keys.
// Purpose: Drop duplicate candidate findings within their dedup bucket.
// Dependencies: aegisflux-core, lru, parking_lot
// ============================================================================

//! ## Overview
//! The dedup key is `sha256(rule_id | host_id | bucket_floor | evidence
//! digest)`, where the bucket floor quantizes the emission time into the
//! rule's dedup window. The cache is an LRU bounded by `CORR_DEDUPE_CAP`
//! (default 100 000): a hit drops the candidate, a miss records the key and
//! lets the finding through. The rule's `ttl_seconds` doubles as the dedup
//! bucket size, floored at one second so zero-ttl rules still dedup within
//! the same second.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;

use aegisflux_core::DEFAULT_HASH_ALGORITHM;
use aegisflux_core::HostId;
use aegisflux_core::RuleId;
use aegisflux_core::core::hashing::hash_parts;
use lru::LruCache;
use parking_lot::Mutex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default cache capacity (`CORR_DEDUPE_CAP`).
pub const DEFAULT_DEDUPE_CAP: usize = 100_000;

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Bounded LRU of finding dedup keys.
///
/// # Invariants
/// - Size never exceeds the configured capacity.
/// - All operations are O(1) under one lock.
pub struct DedupCache {
    /// Keys with their insertion recency.
    inner: Mutex<LruCache<String, ()>>,
}

impl DedupCache {
    /// Creates a cache bounded by `capacity` (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Computes the dedup key for a candidate finding.
    #[must_use]
    pub fn key_for(
        rule_id: &RuleId,
        host_id: &HostId,
        now_ms: i64,
        dedup_window_seconds: u64,
        evidence_digest: &str,
    ) -> String {
        let window = dedup_window_seconds.max(1);
        let now_s = now_ms.div_euclid(1000);
        let bucket = now_s.div_euclid(i64::try_from(window).unwrap_or(i64::MAX));
        let bucket_floor = bucket.saturating_mul(i64::try_from(window).unwrap_or(i64::MAX));
        hash_parts(
            DEFAULT_HASH_ALGORITHM,
            &[
                rule_id.as_str().as_bytes(),
                host_id.as_str().as_bytes(),
                bucket_floor.to_string().as_bytes(),
                evidence_digest.as_bytes(),
            ],
        )
        .value
    }

    /// Records the key when absent; returns true when the candidate is
    /// fresh (absent immediately before insertion).
    pub fn insert_if_absent(&self, key: &str) -> bool {
        let mut cache = self.inner.lock();
        if cache.contains(key) {
            // Refresh recency so hot keys are not evicted mid-burst.
            let _ = cache.get(key);
            return false;
        }
        cache.put(key.to_string(), ());
        true
    }

    /// Returns the number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true when the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::DedupCache;
    use aegisflux_core::HostId;
    use aegisflux_core::RuleId;

    #[test]
    fn cache_never_exceeds_its_capacity() {
        let cache = DedupCache::new(3);
        for index in 0 .. 10 {
            assert!(cache.insert_if_absent(&format!("key-{index}")));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn repeated_keys_report_as_duplicates() {
        let cache = DedupCache::new(10);
        assert!(cache.insert_if_absent("key"));
        assert!(!cache.insert_if_absent("key"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_quantize_into_ttl_buckets() {
        let rule = RuleId::new("rule-1");
        let host = HostId::new("web-01");
        // 10s and 250s fall into the same 300s bucket; 310s does not.
        let first = DedupCache::key_for(&rule, &host, 10_000, 300, "digest");
        let second = DedupCache::key_for(&rule, &host, 250_000, 300, "digest");
        let third = DedupCache::key_for(&rule, &host, 310_000, 300, "digest");
        assert_eq!(first, second);
        assert_ne!(first, third);
    }

    #[test]
    fn zero_ttl_rules_bucket_by_the_second() {
        let rule = RuleId::new("rule-1");
        let host = HostId::new("web-01");
        let first = DedupCache::key_for(&rule, &host, 1_000, 0, "digest");
        let same_second = DedupCache::key_for(&rule, &host, 1_999, 0, "digest");
        let next_second = DedupCache::key_for(&rule, &host, 2_000, 0, "digest");
        assert_eq!(first, same_second);
        assert_ne!(first, next_second);
    }
}
