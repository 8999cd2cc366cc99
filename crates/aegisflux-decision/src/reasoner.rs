// crates/aegisflux-decision/src/reasoner.rs
// ============================================================================
// Module: Reasoner Interface
// Description: Pluggable drafting/segmentation/explanation provider seam.
// Purpose: Keep the pipeline testable without any model provider.
// Dependencies: aegisflux-core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! A [`Reasoner`] may propose plan drafts, related targets, and
//! explanations. Implementations return typed values, never free text that
//! the pipeline would have to parse. Budget enforcement is cross-cutting:
//! when a provider reports [`ReasonerError::BudgetExhausted`], the calling
//! stage MUST fall back to its deterministic path rather than fail the
//! request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aegisflux_core::Finding;
use aegisflux_core::Plan;
use aegisflux_core::PlanDraft;
use aegisflux_core::RelatedTarget;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by reasoner implementations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// The provider's budget is exhausted; stages must fall back.
    #[error("reasoner budget exhausted")]
    BudgetExhausted,
    /// The provider failed for any other reason.
    #[error("reasoner failure: {0}")]
    Provider(String),
}

// ============================================================================
// SECTION: Reasoner Trait
// ============================================================================

/// Pluggable reasoning provider for the pipeline stages.
///
/// # Invariants
/// - Returned drafts keep `desired_mode` inside the closed strategy set
///   (enforced by the type).
/// - Implementations must be safe to call concurrently.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Proposes a plan draft for a finding.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonerError`] when the provider cannot produce a draft.
    async fn draft_plan(&self, finding: &Finding) -> Result<PlanDraft, ReasonerError>;

    /// Proposes up to `limit` targets related to the primary target.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonerError`] when the provider cannot enumerate
    /// relationships.
    async fn related_targets(
        &self,
        primary: &str,
        limit: usize,
    ) -> Result<Vec<RelatedTarget>, ReasonerError>;

    /// Produces an operator-readable explanation for an assembled plan.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonerError`] when the provider cannot explain the plan.
    async fn explain_plan(&self, plan: &Plan) -> Result<String, ReasonerError>;
}
