// crates/aegisflux-decision/src/pipeline.rs
// ============================================================================
// Module: Decision Pipeline
// Description: CreatePlan orchestration across the five stages.
// Purpose: Assemble, store, and publish plans from findings.
// Dependencies: aegisflux-bus, aegisflux-config, aegisflux-core, lru, tokio
// ============================================================================

//! ## Overview
//! `create_plan` executes planner → policy writer → segmenter → guardrails
//! → explainer sequentially within the request, then stores the plan
//! (emitting `plans.created`) and publishes it on `plans.proposed`. Only
//! the final persist/publish step can fail the request; every reasoner
//! failure degrades to the deterministic stage fallback.
//!
//! The pipeline also consumes `correlator.findings` (queue group
//! `decision`) and plans each finding as it arrives, keeping a bounded
//! cache of recent findings for `finding_id`-only plan requests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::CORRELATOR_FINDINGS;
use aegisflux_bus::DEFAULT_PUBLISH_TIMEOUT;
use aegisflux_bus::Headers;
use aegisflux_bus::PLANS_PROPOSED;
use aegisflux_bus::QUEUE_DECISION;
use aegisflux_config::ConfigManager;
use aegisflux_core::CoreError;
use aegisflux_core::Finding;
use aegisflux_core::FindingId;
use aegisflux_core::GuardrailDecision;
use aegisflux_core::Plan;
use aegisflux_core::PlanId;
use aegisflux_core::PlanStatus;
use aegisflux_core::Strategy;
use aegisflux_core::StrategyMode;
use aegisflux_core::core::time::now_unix_millis;
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use time::OffsetDateTime;

use crate::explain::Explainer;
use crate::guardrails::GuardrailsConfig;
use crate::guardrails::decide_strategy;
use crate::planner::Planner;
use crate::policy::PolicyWriter;
use crate::segment::Segmenter;
use crate::store::PlanStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Capacity of the recent-findings cache backing `finding_id` lookups.
pub const RECENT_FINDINGS_CAP: usize = 1000;

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// The decision pipeline and its stage instances.
pub struct DecisionPipeline {
    /// Draft stage.
    planner: Planner,
    /// Policy compile stage.
    policy: PolicyWriter,
    /// Segmentation stage.
    segmenter: Segmenter,
    /// Explanation stage.
    explainer: Explainer,
    /// Live configuration.
    config: Arc<ConfigManager>,
    /// Bounded plan store.
    store: Arc<PlanStore>,
    /// Bus for `plans.proposed`.
    bus: Arc<dyn Bus>,
    /// Recently seen findings for id-only plan requests.
    recent: Mutex<LruCache<FindingId, Finding>>,
}

impl DecisionPipeline {
    /// Assembles the pipeline from its stages and collaborators.
    #[must_use]
    pub fn new(
        planner: Planner,
        segmenter: Segmenter,
        explainer: Explainer,
        config: Arc<ConfigManager>,
        store: Arc<PlanStore>,
        bus: Arc<dyn Bus>,
    ) -> Arc<Self> {
        let cap = NonZeroUsize::new(RECENT_FINDINGS_CAP).unwrap_or(NonZeroUsize::MIN);
        Arc::new(Self {
            planner,
            policy: PolicyWriter::new(),
            segmenter,
            explainer,
            config,
            store,
            bus,
            recent: Mutex::new(LruCache::new(cap)),
        })
    }

    /// Returns the plan store.
    #[must_use]
    pub fn store(&self) -> Arc<PlanStore> {
        Arc::clone(&self.store)
    }

    /// Returns the live config manager.
    #[must_use]
    pub fn config(&self) -> Arc<ConfigManager> {
        Arc::clone(&self.config)
    }

    /// Looks up a recently seen finding by id.
    #[must_use]
    pub fn recent_finding(&self, id: &FindingId) -> Option<Finding> {
        self.recent.lock().get(id).cloned()
    }

    /// Records a finding for later id-only plan requests.
    pub fn remember_finding(&self, finding: &Finding) {
        self.recent.lock().put(finding.id.clone(), finding.clone());
    }

    /// Runs the full pipeline for one finding.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] only when the final
    /// `plans.proposed` publish fails; every stage failure degrades to its
    /// deterministic fallback instead.
    pub async fn create_plan(
        &self,
        finding: Finding,
        desired: Option<StrategyMode>,
    ) -> Result<Plan, CoreError> {
        self.remember_finding(&finding);
        let snapshot = self.config.current();
        let desired = desired.unwrap_or(snapshot.decision_mode);

        // Stage 1: draft.
        let draft = self.planner.draft(&finding, desired).await;

        // Stage 2: policy compile.
        let controls = self.policy.compile(&finding, &draft.intents, snapshot.default_ttl_seconds);

        // Stage 3: segmentation, bounded by the configured canary budget.
        let primary = draft.targets.first().cloned().unwrap_or_default();
        let related = if primary.is_empty() {
            Vec::new()
        } else {
            let budget = usize::try_from(snapshot.max_canary_hosts).unwrap_or(usize::MAX);
            self.segmenter.segment(&primary, budget).await
        };
        let mut targets = draft.targets.clone();
        for candidate in &related {
            if !targets.contains(&candidate.target_id) {
                targets.push(candidate.target_id.clone());
            }
        }

        // Stage 4: guardrails.
        let guardrails_config = GuardrailsConfig::load(&snapshot);
        let host_labels = labels_from_finding(&finding);
        let num_targets = u32::try_from(targets.len()).unwrap_or(u32::MAX);
        let decision = decide_strategy(
            draft.desired_mode,
            num_targets,
            &host_labels,
            &guardrails_config,
            current_hour_utc(),
        );
        log_guardrails(&finding, &decision);

        // Assemble; stage 5 explains the assembled plan.
        let now = now_unix_millis();
        let ttl_ms = i64::try_from(decision.ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        let mut plan = Plan {
            id: PlanId::random(),
            status: PlanStatus::Proposed,
            strategy: Strategy {
                mode: decision.strategy,
                canary_size: decision.canary_size,
                success: draft.success,
                auto_rollback: true,
                control: "simulate".to_string(),
            },
            targets,
            controls,
            ttl_seconds: decision.ttl_seconds,
            explanation: String::new(),
            finding,
            created_at: now,
            updated_at: now,
            expires_at: now.saturating_add(ttl_ms),
        };
        plan.explanation = self.explainer.explain(&plan).await;

        // Persist and announce; only this step can fail the request.
        if let Some(evicted) = self.store.store(plan.clone()) {
            tracing::debug!(plan = %evicted.id, "oldest plan evicted");
        }
        let payload = serde_json::to_vec(&plan)
            .map_err(|err| CoreError::Internal(format!("plan serialization failed: {err}")))?;
        let mut headers = Headers::new();
        headers.insert("x-plan-id".to_string(), plan.id.to_string());
        let publish = self.bus.publish_with_headers(PLANS_PROPOSED, headers, Bytes::from(payload));
        match tokio::time::timeout(DEFAULT_PUBLISH_TIMEOUT, publish).await {
            Ok(Ok(())) => Ok(plan),
            Ok(Err(err)) => Err(CoreError::Unavailable(err.to_string())),
            Err(_) => Err(CoreError::Unavailable(format!(
                "plan publish timed out after {}s",
                DEFAULT_PUBLISH_TIMEOUT.as_secs()
            ))),
        }
    }

    /// Consumes `correlator.findings` (queue group `decision`) and plans
    /// each finding as it arrives.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] when the subscription cannot be
    /// set up.
    pub async fn run(self: Arc<Self>, bus: Arc<dyn Bus>) -> Result<(), CoreError> {
        let mut subscription = bus
            .queue_subscribe(CORRELATOR_FINDINGS, QUEUE_DECISION)
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;
        while let Some(message) = subscription.next().await {
            match serde_json::from_slice::<Finding>(&message.payload) {
                Ok(finding) => {
                    let finding_id = finding.id.clone();
                    if let Err(err) = self.create_plan(finding, None).await {
                        tracing::warn!(finding = %finding_id, error = %err, "plan creation failed");
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "discarding undecodable finding");
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current UTC hour.
fn current_hour_utc() -> u8 {
    OffsetDateTime::now_utc().hour()
}

/// Extracts host labels carried inside finding evidence context.
fn labels_from_finding(finding: &Finding) -> Vec<String> {
    let mut labels = Vec::new();
    for item in &finding.evidence.items {
        if let Some(found) = item.pointer("/context/labels").and_then(Value::as_array) {
            for label in found.iter().filter_map(Value::as_str) {
                if !labels.iter().any(|have| have == label) {
                    labels.push(label.to_string());
                }
            }
        }
    }
    labels
}

/// Logs the guardrail outcome for audit trails.
fn log_guardrails(finding: &Finding, decision: &GuardrailDecision) {
    tracing::info!(
        finding = %finding.id,
        strategy = decision.strategy.as_str(),
        canary_size = decision.canary_size,
        applied = decision.applied_rules.join(","),
        "guardrails decided strategy"
    );
}
