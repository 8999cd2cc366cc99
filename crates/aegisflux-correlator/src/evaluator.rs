// crates/aegisflux-correlator/src/evaluator.rs
// ============================================================================
// Module: Rule Evaluator
// Description: Temporal matcher turning enriched events into findings.
// Purpose: Apply the active snapshot with overrides, dedup, and publication.
// Dependencies: aegisflux-bus, aegisflux-core, serde_json, time, tokio
// ============================================================================

//! ## Overview
//! For each arriving enriched event the engine reads the active snapshot
//! atomically and walks its rules in snapshot order: selector match,
//! override application, window insert, live-window read, predicate, then
//! candidate synthesis. Candidates are deduplicated by
//! `sha256(rule | host | bucket | evidence digest)` before being persisted
//! to the bounded ring and published with bounded retry.
//!
//! Predicate failures count the event as invalid but never halt the
//! pipeline. Within one (rule, host) pair events are processed in receive
//! order; across hosts no ordering is promised.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::EVENTS_ENRICHED;
use aegisflux_bus::QUEUE_CORRELATOR;
use aegisflux_core::CoreError;
use aegisflux_core::CorrelationId;
use aegisflux_core::DEFAULT_HASH_ALGORITHM;
use aegisflux_core::EnrichedEvent;
use aegisflux_core::EvidenceEnvelope;
use aegisflux_core::Finding;
use aegisflux_core::FindingId;
use aegisflux_core::FindingStatus;
use aegisflux_core::core::hashing::hash_bytes;
use aegisflux_core::core::hashing::hash_parts;
use aegisflux_core::core::time::now_unix_millis;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;

use crate::dedup::DedupCache;
use crate::metrics::CorrelatorMetrics;
use crate::overrides::OverrideManager;
use crate::publisher::FindingPublisher;
use crate::rules::loader::RuleLoader;
use crate::rules::model::CompiledRule;
use crate::rules::model::Rule;
use crate::store::FindingStore;
use crate::window::SWEEP_INTERVAL;
use crate::window::WindowBuffer;
use crate::window::WindowEntry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum matched events captured as finding evidence.
pub const MAX_EVIDENCE_ITEMS: usize = 10;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// The correlator's evaluation engine.
///
/// # Invariants
/// - Rules are iterated in snapshot order; one finding per matching rule,
///   dedup permitting.
/// - Store persistence happens before publication, so query results include
///   findings whose publish later failed.
pub struct CorrelatorEngine {
    /// Active rule snapshot owner.
    loader: Arc<RuleLoader>,
    /// Runtime overrides.
    overrides: Arc<OverrideManager>,
    /// Per-(rule, host) window buffers.
    window: Arc<WindowBuffer>,
    /// Dedup cache over candidate keys.
    dedup: DedupCache,
    /// Bounded finding ring shared with the HTTP API.
    store: Arc<FindingStore>,
    /// Finding publisher.
    publisher: FindingPublisher,
    /// Pipeline counters shared with the HTTP API.
    metrics: Arc<CorrelatorMetrics>,
}

impl CorrelatorEngine {
    /// Assembles an engine from its parts.
    #[must_use]
    pub fn new(
        loader: Arc<RuleLoader>,
        overrides: Arc<OverrideManager>,
        window: Arc<WindowBuffer>,
        store: Arc<FindingStore>,
        publisher: FindingPublisher,
        metrics: Arc<CorrelatorMetrics>,
        dedupe_cap: usize,
    ) -> Self {
        Self {
            loader,
            overrides,
            window,
            dedup: DedupCache::new(dedupe_cap),
            store,
            publisher,
            metrics,
        }
    }

    /// Consumes `events.enriched` (queue group `correlator`) until the
    /// subscription closes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] when the subscription cannot be
    /// set up.
    pub async fn run(self: Arc<Self>, bus: Arc<dyn Bus>) -> Result<(), CoreError> {
        let mut subscription = bus
            .queue_subscribe(EVENTS_ENRICHED, QUEUE_CORRELATOR)
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;
        while let Some(message) = subscription.next().await {
            self.handle_payload(&message.payload, now_unix_millis()).await;
        }
        Ok(())
    }

    /// Periodically evicts stale window entries using the snapshot's
    /// largest window as grace.
    pub async fn run_window_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let grace = self.loader.snapshot().max_window_seconds();
            let evicted = self.window.sweep(now_unix_millis(), grace);
            if evicted > 0 {
                tracing::debug!(evicted, grace, "window entries evicted");
            }
        }
    }

    /// Processes one enriched-event payload.
    ///
    /// Returns the number of findings emitted for the event.
    pub async fn handle_payload(&self, payload: &[u8], received_at: i64) -> usize {
        let event: EnrichedEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                self.metrics.inc_invalid();
                tracing::debug!(error = %err, "discarding undecodable enriched event");
                return 0;
            }
        };
        self.metrics.inc_processed();
        self.evaluate(&event, received_at).await
    }

    /// Evaluates one event against the active snapshot.
    async fn evaluate(&self, event: &EnrichedEvent, received_at: i64) -> usize {
        let snapshot = self.loader.snapshot();
        let event_value = Arc::new(event.to_value());
        let event_ts = event.timestamp_or(received_at);
        let mut emitted = 0;

        for compiled in &snapshot.rules {
            let rule = &compiled.rule;
            let active_override = self.overrides.effective_for(&rule.rule_id, received_at);
            let enabled =
                active_override.as_ref().and_then(|o| o.enabled).unwrap_or(rule.enabled);
            if !enabled || !rule.selectors.matches(event) {
                continue;
            }

            self.window.insert(
                &rule.rule_id,
                &event.host_id,
                Arc::clone(&event_value),
                event_ts,
                rule.condition.window.duration_seconds,
            );
            let live = self.window.live(&rule.rule_id, &event.host_id, received_at);

            let mut matched = Vec::with_capacity(live.len());
            let mut predicate_failed = false;
            for entry in live {
                match compiled.predicate.eval(&entry.event) {
                    Ok(true) => matched.push(entry),
                    Ok(false) => {}
                    Err(err) => {
                        predicate_failed = true;
                        tracing::debug!(
                            rule = %rule.rule_id,
                            error = %err,
                            "predicate evaluation failed"
                        );
                        break;
                    }
                }
            }
            if predicate_failed {
                self.metrics.inc_invalid();
                continue;
            }
            if !condition_holds(compiled, &matched, event_ts) {
                continue;
            }

            let severity =
                active_override.as_ref().and_then(|o| o.severity).unwrap_or(rule.outcome.severity);
            let confidence = active_override
                .as_ref()
                .and_then(|o| o.confidence)
                .unwrap_or(rule.outcome.confidence);
            let ttl_seconds = active_override
                .as_ref()
                .and_then(|o| o.ttl_seconds)
                .unwrap_or(rule.outcome.ttl_seconds);

            let evidence = build_evidence(rule, &matched);
            let evidence_digest = evidence_digest(&matched);
            let dedup_key = DedupCache::key_for(
                &rule.rule_id,
                &event.host_id,
                received_at,
                ttl_seconds,
                &evidence_digest,
            );
            if !self.dedup.insert_if_absent(&dedup_key) {
                self.metrics.inc_deduped();
                continue;
            }

            let finding = Finding {
                id: finding_id(&dedup_key),
                severity,
                confidence,
                status: FindingStatus::Open,
                host_id: event.host_id.clone(),
                cve: event.context_str("cve").map(ToString::to_string),
                evidence,
                timestamp: received_at,
                rule_id: rule.rule_id.clone(),
                ttl_seconds,
                correlation_id: Some(
                    event
                        .context_str("correlation_id")
                        .map_or_else(CorrelationId::random, CorrelationId::from),
                ),
                tags: rule.outcome.tags.clone(),
            };

            if let Some(evicted) = self.store.push(finding.clone()) {
                tracing::debug!(finding = %evicted.id, "oldest finding evicted from ring");
            }
            self.metrics.inc_emitted();
            emitted += 1;

            if let Err(err) = self.publisher.publish_with_retry(&finding).await {
                self.metrics.inc_publish_failure();
                tracing::warn!(
                    finding = %finding.id,
                    error = %err,
                    "finding publish dropped after retry exhaustion"
                );
            }
        }
        emitted
    }

    /// Returns the finding store shared with the HTTP API.
    #[must_use]
    pub fn store(&self) -> Arc<FindingStore> {
        Arc::clone(&self.store)
    }

    /// Returns the metrics counters shared with the HTTP API.
    #[must_use]
    pub fn metrics(&self) -> Arc<CorrelatorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns the number of cached dedup keys.
    #[must_use]
    pub fn dedup_len(&self) -> usize {
        self.dedup.len()
    }
}

// ============================================================================
// SECTION: Condition Evaluation
// ============================================================================

/// Checks count, time masks, and inter-event intervals over matched entries.
fn condition_holds(compiled: &CompiledRule, matched: &[WindowEntry], event_ts: i64) -> bool {
    let condition = &compiled.rule.condition;
    if matched.len() < usize::try_from(condition.min_count).unwrap_or(usize::MAX) {
        return false;
    }
    if let Some(range) = condition.time_of_day
        && !range.contains(hour_of(event_ts))
    {
        return false;
    }
    if let Some(days) = &condition.days_of_week
        && !days.contains(&day_of_week(event_ts))
    {
        return false;
    }
    if condition.min_interval_seconds.is_some() || condition.max_interval_seconds.is_some() {
        let mut starts: Vec<i64> = matched.iter().map(|entry| entry.window_start).collect();
        starts.sort_unstable();
        for pair in starts.windows(2) {
            let gap_ms = pair[1].saturating_sub(pair[0]);
            if let Some(min) = condition.min_interval_seconds
                && gap_ms < i64::try_from(min.saturating_mul(1000)).unwrap_or(i64::MAX)
            {
                return false;
            }
            if let Some(max) = condition.max_interval_seconds
                && gap_ms > i64::try_from(max.saturating_mul(1000)).unwrap_or(i64::MAX)
            {
                return false;
            }
        }
    }
    true
}

/// Returns the UTC hour for a unix-millisecond timestamp.
fn hour_of(unix_millis: i64) -> u8 {
    OffsetDateTime::from_unix_timestamp(unix_millis.div_euclid(1000))
        .map(|instant| instant.hour())
        .unwrap_or(0)
}

/// Returns the UTC day of week (0 = Sunday .. 6 = Saturday).
fn day_of_week(unix_millis: i64) -> u8 {
    OffsetDateTime::from_unix_timestamp(unix_millis.div_euclid(1000))
        .map(|instant| instant.weekday().number_days_from_sunday())
        .unwrap_or(0)
}

// ============================================================================
// SECTION: Finding Synthesis
// ============================================================================

/// Builds the evidence envelope: a summary item plus matched event values.
fn build_evidence(rule: &Rule, matched: &[WindowEntry]) -> EvidenceEnvelope {
    let mut items = Vec::with_capacity(matched.len().min(MAX_EVIDENCE_ITEMS) + 1);
    items.push(json!({
        "summary": rule.outcome.title,
        "description": rule.outcome.description,
        "matched_events": matched.len(),
        "window_seconds": rule.condition.window.duration_seconds,
    }));
    for entry in matched.iter().take(MAX_EVIDENCE_ITEMS) {
        items.push(Value::clone(&entry.event));
    }
    EvidenceEnvelope::new(items)
}

/// Digests the primary (earliest matched) event for the dedup key.
///
/// The digest must stay stable as later events join the same window, so it
/// covers the first matched event rather than the evidence summary.
fn evidence_digest(matched: &[WindowEntry]) -> String {
    let primary = matched
        .iter()
        .min_by_key(|entry| entry.window_start)
        .map(|entry| entry.event.to_string())
        .unwrap_or_default();
    hash_bytes(DEFAULT_HASH_ALGORITHM, primary.as_bytes()).value[.. 16].to_string()
}

/// Derives the finding id from the dedup key material.
fn finding_id(dedup_key: &str) -> FindingId {
    let digest = hash_parts(DEFAULT_HASH_ALGORITHM, &[b"finding", dedup_key.as_bytes()]);
    FindingId::new(&digest.value[.. 32])
}
