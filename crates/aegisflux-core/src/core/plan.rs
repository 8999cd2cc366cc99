// crates/aegisflux-core/src/core/plan.rs
// ============================================================================
// Module: AegisFlux Plans
// Description: Decision-pipeline records from draft through stored plan.
// Purpose: Provide plans, strategies, control intents, and policy artifacts.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The decision pipeline turns a finding into a [`Plan`] through draft,
//! policy compilation, target segmentation, guardrails, and explanation.
//! [`StrategyMode`] is an ordered set, most to least aggressive; guardrails
//! downgrade along that order and never invent a mode outside it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::finding::Finding;
use crate::core::identifiers::PlanId;
use crate::error::CoreError;

// ============================================================================
// SECTION: Strategy Mode
// ============================================================================

/// Ordered strategy set, most to least aggressive.
///
/// # Invariants
/// - Variants are stable for serialization and guardrail downgrades.
/// - Declaration order is the aggressiveness order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Apply controls to every target immediately.
    Enforce,
    /// Apply controls broadly with fast rollout.
    Aggressive,
    /// Apply controls to a bounded canary subset first.
    Canary,
    /// Staged rollout with conservative pacing.
    Balanced,
    /// Propose controls without applying them.
    Suggest,
    /// Propose controls and require explicit operator action.
    Conservative,
    /// Record intent only; no controls proposed.
    Observe,
}

impl StrategyMode {
    /// All modes in aggressiveness order, most aggressive first.
    pub const ALL: [Self; 7] = [
        Self::Enforce,
        Self::Aggressive,
        Self::Canary,
        Self::Balanced,
        Self::Suggest,
        Self::Conservative,
        Self::Observe,
    ];

    /// Returns the stable wire label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enforce => "enforce",
            Self::Aggressive => "aggressive",
            Self::Canary => "canary",
            Self::Balanced => "balanced",
            Self::Suggest => "suggest",
            Self::Conservative => "conservative",
            Self::Observe => "observe",
        }
    }

    /// Returns true when the mode applies controls without operator action.
    #[must_use]
    pub const fn is_enforcing(self) -> bool {
        matches!(self, Self::Enforce | Self::Aggressive)
    }
}

impl FromStr for StrategyMode {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "enforce" => Ok(Self::Enforce),
            "aggressive" => Ok(Self::Aggressive),
            "canary" => Ok(Self::Canary),
            "balanced" => Ok(Self::Balanced),
            "suggest" => Ok(Self::Suggest),
            "conservative" => Ok(Self::Conservative),
            "observe" => Ok(Self::Observe),
            other => Err(CoreError::InvalidInput(format!("unknown strategy mode: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Plan Status
// ============================================================================

/// Plan lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Assembled but not yet published.
    Pending,
    /// Published for operator review.
    Proposed,
    /// Controls are being applied.
    Active,
    /// Rollout completed successfully.
    Completed,
    /// Rollout failed.
    Failed,
    /// Plan was cancelled before completion.
    Cancelled,
}

// ============================================================================
// SECTION: Draft Inputs
// ============================================================================

/// Success criteria attached to a strategy.
///
/// # Invariants
/// - `min_success_rate` is within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    /// Minimum fraction of targets that must apply cleanly.
    pub min_success_rate: f64,
    /// Rollout evaluation timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self {
            min_success_rate: 0.95,
            timeout_seconds: 300,
        }
    }
}

/// A control intent derived from finding evidence.
///
/// # Invariants
/// - `target` is either a literal host/service id or the sentinel
///   `finding_host`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlIntent {
    /// Intent action, e.g. `suggest` or `enforce`.
    pub action: String,
    /// Control type, e.g. `nft_drop`.
    #[serde(rename = "type")]
    pub control_type: String,
    /// Intent lifetime in seconds.
    pub ttl_seconds: u64,
    /// Target sentinel or literal identifier.
    pub target: String,
    /// Explicit scope override, when the intent pins one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Process id scope hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Cgroup scope hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgroup: Option<String>,
}

/// The planner's output before policy compilation.
///
/// # Invariants
/// - `desired_mode` is always inside the [`StrategyMode`] closed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    /// Initial target list; the finding host when non-empty.
    pub targets: Vec<String>,
    /// Control intents derived from evidence.
    pub intents: Vec<ControlIntent>,
    /// Strategy the planner wants before guardrails.
    pub desired_mode: StrategyMode,
    /// Success criteria for the rollout.
    pub success: SuccessCriteria,
}

// ============================================================================
// SECTION: Policy Controls
// ============================================================================

/// Kind of a compiled policy artifact.
///
/// # Invariants
/// - Variants are stable for serialization and downstream renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyArtifactKind {
    /// nftables ruleset text.
    Nftables,
    /// Cilium network policy YAML.
    Cilium,
    /// eBPF program descriptor.
    Ebpf,
    /// Kubernetes NetworkPolicy YAML.
    Kubernetes,
}

impl PolicyArtifactKind {
    /// Returns the stable wire label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nftables => "nftables",
            Self::Cilium => "cilium",
            Self::Ebpf => "ebpf",
            Self::Kubernetes => "kubernetes",
        }
    }
}

/// A rendered policy artifact.
///
/// # Invariants
/// - `content` is deterministic templated output of the source intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyArtifact {
    /// Artifact kind.
    pub kind: PolicyArtifactKind,
    /// Rendered artifact body.
    pub content: String,
    /// Renderer metadata (template name, intent fields).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// True when the artifact is a preview rather than the primary output.
    pub preview: bool,
}

/// A compiled policy control attached to a plan.
///
/// # Invariants
/// - `mode` is `simulate` until agent-side enforcement promotes it.
/// - `scope` is inferred as explicit > pid > cgroup > host > `host/unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyControl {
    /// Control identifier.
    pub control_id: String,
    /// Control type copied from the source intent, e.g. `nft_drop`.
    #[serde(rename = "type")]
    pub control_type: String,
    /// Compilation mode; always `simulate` at this layer.
    pub mode: String,
    /// Scope kind, e.g. `host`, `pid`, `cgroup`.
    pub scope: String,
    /// Scope identifier within the scope kind.
    pub scope_id: String,
    /// Control lifetime in seconds.
    pub ttl_seconds: u64,
    /// Rendered policy artifacts.
    pub artifacts: Vec<PolicyArtifact>,
}

// ============================================================================
// SECTION: Segmentation
// ============================================================================

/// Relationship of a related target to the primary target.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Same tier as the primary target.
    Peer,
    /// The primary target depends on this target.
    Dependency,
    /// Traffic flows from this target into the primary.
    Upstream,
    /// Traffic flows from the primary into this target.
    Downstream,
}

/// Risk classification for a related target.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low blast radius.
    Low,
    /// Moderate blast radius.
    Medium,
    /// High blast radius.
    High,
}

/// A target related to the primary, produced by the segmenter.
///
/// # Invariants
/// - `risk_score` and `confidence` are within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedTarget {
    /// Target identifier.
    pub target_id: String,
    /// Target type, e.g. `host` or `service`.
    pub target_type: String,
    /// Relationship to the primary target.
    pub relationship: Relationship,
    /// Risk score in `[0, 1]`.
    pub risk_score: f64,
    /// Risk classification derived from the score.
    pub risk_level: RiskLevel,
    /// Confidence in the relationship in `[0, 1]`.
    pub confidence: f64,
}

// ============================================================================
// SECTION: Guardrail Decision
// ============================================================================

/// Output of the guardrails strategy decider.
///
/// # Invariants
/// - `strategy` is always inside the [`StrategyMode`] closed set.
/// - `reasons` and `applied_rules` are ordered by rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailDecision {
    /// Final strategy after downgrades.
    pub strategy: StrategyMode,
    /// Canary subset size; zero outside canary rollouts.
    pub canary_size: u32,
    /// Plan lifetime in seconds.
    pub ttl_seconds: u64,
    /// Human-readable reasons, one per applied rule.
    pub reasons: Vec<String>,
    /// Stable rule names, one per applied rule.
    pub applied_rules: Vec<String>,
}

// ============================================================================
// SECTION: Strategy and Plan
// ============================================================================

/// Strategy block stored on a plan.
///
/// # Invariants
/// - `canary_size` is meaningful only for canary rollouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Final strategy mode.
    pub mode: StrategyMode,
    /// Canary subset size.
    pub canary_size: u32,
    /// Success criteria for the rollout.
    pub success: SuccessCriteria,
    /// True when failed controls roll back automatically.
    pub auto_rollback: bool,
    /// Control channel the plan compiles for; `simulate` at this layer.
    pub control: String,
}

/// A controlled response to a finding.
///
/// # Invariants
/// - `status` transitions follow the [`PlanStatus`] lifecycle.
/// - `expires_at` is derived from `created_at + ttl_seconds`.
/// - The embedded finding is a snapshot; later finding mutations do not
///   propagate into stored plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier.
    pub id: PlanId,
    /// Lifecycle status.
    pub status: PlanStatus,
    /// Strategy block decided by guardrails.
    pub strategy: Strategy,
    /// Host/service targets, primary first.
    pub targets: Vec<String>,
    /// Compiled policy controls.
    pub controls: Vec<PolicyControl>,
    /// Plan lifetime in seconds.
    pub ttl_seconds: u64,
    /// Operator-readable explanation.
    pub explanation: String,
    /// Snapshot of the originating finding.
    pub finding: Finding,
    /// Creation time as unix milliseconds.
    pub created_at: i64,
    /// Last update time as unix milliseconds.
    pub updated_at: i64,
    /// Expiry time as unix milliseconds.
    pub expires_at: i64,
}
