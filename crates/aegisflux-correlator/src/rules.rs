// crates/aegisflux-correlator/src/rules.rs
// ============================================================================
// Module: Correlation Rules
// Description: Rule model, compiled predicates, and the snapshot loader.
// Purpose: Group the rule subsystem behind one module path.
// Dependencies: submodules
// ============================================================================

//! ## Overview
//! Rules are declared in JSON files, validated and compiled by the loader,
//! and published as immutable [`RuleSnapshot`](model::RuleSnapshot) values.
//! Evaluators hold a snapshot reference until the next load.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod loader;
pub mod model;
pub mod predicate;
