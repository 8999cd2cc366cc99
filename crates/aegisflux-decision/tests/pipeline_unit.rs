// crates/aegisflux-decision/tests/pipeline_unit.rs
// ============================================================================
// Module: Pipeline Unit Tests
// Description: CreatePlan behavior over the in-memory bus.
// Purpose: Validate stage composition, fallbacks, and publications.
// Dependencies: aegisflux-bus, aegisflux-config, aegisflux-decision, tokio
// ============================================================================

//! ## Overview
//! Drives [`aegisflux_decision::DecisionPipeline`] end to end with findings
//! and asserts the assembled plans: suggest plans with nftables controls
//! from network evidence, never-block caps from evidence labels, the
//! reasoner budget fallback, and the `plans.created`/`plans.proposed`
//! publications.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_bus::MemoryBus;
use aegisflux_bus::PLANS_CREATED;
use aegisflux_bus::PLANS_PROPOSED;
use aegisflux_config::ConfigManager;
use aegisflux_config::ConfigSnapshot;
use aegisflux_core::EvidenceEnvelope;
use aegisflux_core::Finding;
use aegisflux_core::FindingStatus;
use aegisflux_core::Plan;
use aegisflux_core::PlanDraft;
use aegisflux_core::PlanStatus;
use aegisflux_core::PolicyArtifactKind;
use aegisflux_core::RelatedTarget;
use aegisflux_core::Severity;
use aegisflux_core::StrategyMode;
use aegisflux_decision::DecisionPipeline;
use aegisflux_decision::EXPLANATION_FALLBACK;
use aegisflux_decision::Explainer;
use aegisflux_decision::PlanStore;
use aegisflux_decision::Planner;
use aegisflux_decision::Reasoner;
use aegisflux_decision::ReasonerError;
use aegisflux_decision::Segmenter;
use aegisflux_decision::explain::redact_secrets;
use async_trait::async_trait;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn network_finding(host: &str) -> Finding {
    Finding {
        id: "f-1".into(),
        severity: Severity::High,
        confidence: 0.9,
        status: FindingStatus::Open,
        host_id: host.into(),
        cve: None,
        evidence: EvidenceEnvelope::new(vec![json!(
            "Network connection followed by process execution"
        )]),
        timestamp: 1_700_000_000_000,
        rule_id: "burst-connect".into(),
        ttl_seconds: 300,
        correlation_id: Some("corr-1".into()),
        tags: vec!["network".to_string()],
    }
}

fn pipeline_with(
    snapshot: ConfigSnapshot,
    reasoner: Option<Arc<dyn Reasoner>>,
    bus: &MemoryBus,
) -> Arc<DecisionPipeline> {
    let bus: Arc<dyn Bus> = Arc::new(bus.clone());
    let config = ConfigManager::new(snapshot);
    let store = PlanStore::new(100, Arc::clone(&bus));
    DecisionPipeline::new(
        Planner::new(reasoner.clone()),
        Segmenter::new(reasoner.clone()),
        Explainer::new(reasoner),
        config,
        store,
        bus,
    )
}

/// Reasoner that always reports an exhausted budget.
struct ExhaustedReasoner;

#[async_trait]
impl Reasoner for ExhaustedReasoner {
    async fn draft_plan(&self, _finding: &Finding) -> Result<PlanDraft, ReasonerError> {
        Err(ReasonerError::BudgetExhausted)
    }

    async fn related_targets(
        &self,
        _primary: &str,
        _limit: usize,
    ) -> Result<Vec<RelatedTarget>, ReasonerError> {
        Err(ReasonerError::BudgetExhausted)
    }

    async fn explain_plan(&self, _plan: &Plan) -> Result<String, ReasonerError> {
        Err(ReasonerError::BudgetExhausted)
    }
}

// ============================================================================
// SECTION: Deterministic Path
// ============================================================================

#[tokio::test]
async fn network_evidence_yields_a_suggest_plan_with_nftables_controls() {
    let bus = MemoryBus::new();
    let pipeline = pipeline_with(ConfigSnapshot::default(), None, &bus);

    let plan =
        pipeline.create_plan(network_finding("web-01"), None).await.expect("plan created");

    assert_eq!(plan.targets.first().map(String::as_str), Some("web-01"));
    assert_eq!(plan.strategy.mode, StrategyMode::Suggest);
    assert_eq!(plan.strategy.canary_size, 0);
    assert_eq!(plan.ttl_seconds, 3600);
    assert_eq!(plan.status, PlanStatus::Proposed);
    assert_eq!(plan.controls.len(), 1);
    let control = &plan.controls[0];
    assert_eq!(control.control_type, "nft_drop");
    assert_eq!(control.mode, "simulate");
    assert_eq!(control.scope, "host");
    assert_eq!(control.scope_id, "web-01");
    assert!(
        control
            .artifacts
            .iter()
            .any(|artifact| artifact.kind == PolicyArtifactKind::Nftables && !artifact.preview)
    );
    assert!(plan.explanation.lines().count() >= 3);
    assert_eq!(plan.expires_at, plan.created_at + 3_600_000);
}

#[tokio::test]
async fn non_network_evidence_compiles_no_controls() {
    let bus = MemoryBus::new();
    let pipeline = pipeline_with(ConfigSnapshot::default(), None, &bus);

    let mut finding = network_finding("web-01");
    finding.evidence = EvidenceEnvelope::new(vec![json!("Suspicious file modification in /etc")]);
    let plan = pipeline.create_plan(finding, None).await.expect("plan created");
    assert!(plan.controls.is_empty());
    assert!(plan.explanation.contains("intent only"));
}

#[tokio::test]
async fn segmentation_expands_web_hosts_to_their_tier_counterparts() {
    let bus = MemoryBus::new();
    let pipeline = pipeline_with(ConfigSnapshot::default(), None, &bus);

    let plan =
        pipeline.create_plan(network_finding("web-01"), None).await.expect("plan created");
    assert!(plan.targets.contains(&"db-01".to_string()));
    assert!(plan.targets.contains(&"lb-01".to_string()));
}

#[tokio::test]
async fn plans_are_published_on_created_and_proposed_subjects() {
    let bus = MemoryBus::new();
    let mut created = bus.subscribe(PLANS_CREATED).await.expect("subscribe");
    let mut proposed = bus.subscribe(PLANS_PROPOSED).await.expect("subscribe");
    let pipeline = pipeline_with(ConfigSnapshot::default(), None, &bus);

    let plan =
        pipeline.create_plan(network_finding("web-01"), None).await.expect("plan created");

    let proposed_message = proposed.next().await.expect("proposed event");
    let proposed_plan: Plan =
        serde_json::from_slice(&proposed_message.payload).expect("decode plan");
    assert_eq!(proposed_plan.id, plan.id);
    assert_eq!(
        proposed_message.headers.get("x-plan-id"),
        Some(&plan.id.to_string())
    );

    let created_message = created.next().await.expect("created event");
    let created_plan: Plan = serde_json::from_slice(&created_message.payload).expect("decode plan");
    assert_eq!(created_plan.id, plan.id);
}

// ============================================================================
// SECTION: Guardrail Interaction
// ============================================================================

#[tokio::test]
async fn evidence_labels_cap_enforce_requests_to_canary() {
    let bus = MemoryBus::new();
    let snapshot = ConfigSnapshot {
        never_block_labels: vec!["production".to_string()],
        ..ConfigSnapshot::default()
    };
    let pipeline = pipeline_with(snapshot, None, &bus);

    let mut finding = network_finding("web-01");
    finding.evidence = EvidenceEnvelope::new(vec![
        json!("Network connection burst"),
        json!({"context": {"labels": ["production"]}}),
    ]);
    let plan = pipeline
        .create_plan(finding, Some(StrategyMode::Enforce))
        .await
        .expect("plan created");
    assert!(!plan.strategy.mode.is_enforcing());
    assert_eq!(plan.strategy.mode, StrategyMode::Canary);
    assert!(plan.strategy.canary_size > 0);
}

// ============================================================================
// SECTION: Reasoner Fallback
// ============================================================================

#[tokio::test]
async fn budget_exhaustion_degrades_every_stage_to_its_fallback() {
    let bus = MemoryBus::new();
    let exhausted: Arc<dyn Reasoner> = Arc::new(ExhaustedReasoner);
    let with_reasoner = pipeline_with(ConfigSnapshot::default(), Some(exhausted), &bus);
    let without_reasoner = pipeline_with(ConfigSnapshot::default(), None, &bus);

    let degraded = with_reasoner
        .create_plan(network_finding("web-01"), None)
        .await
        .expect("plan despite exhausted budget");
    let baseline = without_reasoner
        .create_plan(network_finding("web-01"), None)
        .await
        .expect("baseline plan");

    assert_eq!(degraded.strategy, baseline.strategy);
    assert_eq!(degraded.targets, baseline.targets);
    assert_eq!(degraded.controls.len(), baseline.controls.len());
    assert_eq!(degraded.explanation, baseline.explanation);
    assert_ne!(degraded.explanation, EXPLANATION_FALLBACK);
}

// ============================================================================
// SECTION: Recent Findings and Redaction
// ============================================================================

#[tokio::test]
async fn planned_findings_are_remembered_for_id_lookups() {
    let bus = MemoryBus::new();
    let pipeline = pipeline_with(ConfigSnapshot::default(), None, &bus);

    let finding = network_finding("web-01");
    let _ = pipeline.create_plan(finding.clone(), None).await.expect("plan created");
    let cached = pipeline.recent_finding(&finding.id).expect("cached finding");
    assert_eq!(cached.id, finding.id);
    assert!(pipeline.recent_finding(&"unknown".into()).is_none());
}

#[test]
fn redaction_masks_secret_material_but_keeps_prose() {
    let input = "rollout uses api_key=sk-12345 on host web-01\npassword: hunter2 stays out";
    let output = redact_secrets(input);
    assert!(output.contains("api_key=[REDACTED]"));
    assert!(!output.contains("sk-12345"));
    assert!(!output.contains("hunter2"));
    assert!(output.contains("host web-01"));
}
