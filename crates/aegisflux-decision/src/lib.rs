// crates/aegisflux-decision/src/lib.rs
// ============================================================================
// Module: AegisFlux Decision Library
// Description: Finding-to-plan pipeline with guardrails and fallbacks.
// Purpose: Turn findings into enforceable, explained decision plans.
// Dependencies: aegisflux-bus, aegisflux-config, aegisflux-core, tokio
// ============================================================================

//! ## Overview
//! The decision pipeline executes draft → policy compile → target
//! segmentation → guardrails → explanation for each finding. Every stage
//! accepts an optional [`Reasoner`] and falls back to a deterministic path
//! on any reasoner failure, including budget exhaustion, so `POST /plans`
//! always returns a valid plan unless the final persist step fails.
//! Invariants:
//! - Guardrails never return an error and never leave the closed strategy
//!   set.
//! - The plan store is bounded; eviction drops the oldest `created_at`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod explain;
pub mod guardrails;
pub mod http;
pub mod pipeline;
pub mod planner;
pub mod policy;
pub mod reasoner;
pub mod segment;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use explain::EXPLANATION_FALLBACK;
pub use explain::Explainer;
pub use guardrails::GuardrailsConfig;
pub use guardrails::decide_strategy;
pub use pipeline::DecisionPipeline;
pub use planner::Planner;
pub use policy::PolicyWriter;
pub use reasoner::Reasoner;
pub use reasoner::ReasonerError;
pub use segment::Segmenter;
pub use store::PlanStore;
