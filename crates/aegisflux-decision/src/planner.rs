// crates/aegisflux-decision/src/planner.rs
// ============================================================================
// Module: Planner
// Description: First pipeline stage synthesizing plan drafts.
// Purpose: Derive targets and control intents from finding evidence.
// Dependencies: aegisflux-core, tracing
// ============================================================================

//! ## Overview
//! The deterministic draft targets the finding host and derives intents
//! from evidence: any evidence string matching one of
//! [`NETWORK_EVIDENCE_NEEDLES`] case-insensitively yields a single
//! `suggest`/`nft_drop` intent against the finding host. A present reasoner
//! may propose richer drafts; any reasoner failure falls back here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use aegisflux_core::ControlIntent;
use aegisflux_core::Finding;
use aegisflux_core::PlanDraft;
use aegisflux_core::StrategyMode;
use aegisflux_core::SuccessCriteria;

use crate::reasoner::Reasoner;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Evidence substrings that imply a network-control intent.
pub const NETWORK_EVIDENCE_NEEDLES: [&str; 3] = ["connect", "connection", "network"];

/// Intent lifetime for the fallback network intent.
pub const FALLBACK_INTENT_TTL_SECONDS: u64 = 3600;

/// Sentinel target resolved to the finding host at policy compile time.
pub const TARGET_FINDING_HOST: &str = "finding_host";

// ============================================================================
// SECTION: Planner
// ============================================================================

/// First pipeline stage.
pub struct Planner {
    /// Optional reasoning provider.
    reasoner: Option<Arc<dyn Reasoner>>,
}

impl Planner {
    /// Creates a planner with an optional reasoner.
    #[must_use]
    pub fn new(reasoner: Option<Arc<dyn Reasoner>>) -> Self {
        Self {
            reasoner,
        }
    }

    /// Synthesizes a draft, preferring the reasoner when one is present.
    pub async fn draft(&self, finding: &Finding, desired: StrategyMode) -> PlanDraft {
        if let Some(reasoner) = &self.reasoner {
            match reasoner.draft_plan(finding).await {
                Ok(draft) => return normalize(draft, finding),
                Err(err) => {
                    tracing::warn!(
                        finding = %finding.id,
                        error = %err,
                        "reasoner draft failed, using deterministic fallback"
                    );
                }
            }
        }
        Self::fallback_draft(finding, desired)
    }

    /// The deterministic draft path.
    #[must_use]
    pub fn fallback_draft(finding: &Finding, desired: StrategyMode) -> PlanDraft {
        let mut targets = Vec::new();
        if !finding.host_id.as_str().is_empty() {
            targets.push(finding.host_id.to_string());
        }
        let intents = if NETWORK_EVIDENCE_NEEDLES
            .iter()
            .any(|needle| finding.evidence_contains(needle))
        {
            vec![ControlIntent {
                action: "suggest".to_string(),
                control_type: "nft_drop".to_string(),
                ttl_seconds: FALLBACK_INTENT_TTL_SECONDS,
                target: TARGET_FINDING_HOST.to_string(),
                scope: None,
                pid: None,
                cgroup: None,
            }]
        } else {
            Vec::new()
        };
        PlanDraft {
            targets,
            intents,
            desired_mode: desired,
            success: SuccessCriteria::default(),
        }
    }
}

/// Normalizes a reasoner draft so downstream stages can rely on it.
fn normalize(mut draft: PlanDraft, finding: &Finding) -> PlanDraft {
    if draft.targets.is_empty() && !finding.host_id.as_str().is_empty() {
        draft.targets.push(finding.host_id.to_string());
    }
    if !(0.0 ..= 1.0).contains(&draft.success.min_success_rate) {
        draft.success = SuccessCriteria::default();
    }
    draft
}
