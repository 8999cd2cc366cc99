// crates/aegisflux-core/src/lib.rs
// ============================================================================
// Module: AegisFlux Core Library
// Description: Domain model shared by every AegisFlux service.
// Purpose: Provide events, findings, plans, agents, artifacts, and errors.
// Dependencies: serde, serde_json, sha2, time, uuid
// ============================================================================

//! ## Overview
//! AegisFlux Core defines the wire-stable domain model for the telemetry
//! pipeline: events admitted at ingest, enriched events consumed by the
//! correlator, findings emitted by rules, plans produced by the decision
//! pipeline, and the agent/artifact records managed by the registry.
//! Invariants:
//! - Wire enums are closed sets; unknown variants fail deserialization.
//! - Validation happens at construction boundaries, never on the hot path.
//! - Records carried on the bus are immutable copies; subscribers never
//!   mutate shared state through them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod error;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::agent::Agent;
pub use self::core::agent::PendingRegistration;
pub use self::core::artifact::Artifact;
pub use self::core::artifact::ArtifactMetadata;
pub use self::core::event::EnrichedEvent;
pub use self::core::event::Event;
pub use self::core::event::EventType;
pub use self::core::finding::EvidenceEnvelope;
pub use self::core::finding::Finding;
pub use self::core::finding::FindingStatus;
pub use self::core::finding::Severity;
pub use self::core::hashing::DEFAULT_HASH_ALGORITHM;
pub use self::core::hashing::HashAlgorithm;
pub use self::core::hashing::HashDigest;
pub use self::core::identifiers::AgentUid;
pub use self::core::identifiers::ArtifactId;
pub use self::core::identifiers::CorrelationId;
pub use self::core::identifiers::EventId;
pub use self::core::identifiers::FindingId;
pub use self::core::identifiers::HostId;
pub use self::core::identifiers::OverrideId;
pub use self::core::identifiers::PlanId;
pub use self::core::identifiers::RegistrationId;
pub use self::core::identifiers::RuleId;
pub use self::core::plan::ControlIntent;
pub use self::core::plan::GuardrailDecision;
pub use self::core::plan::Plan;
pub use self::core::plan::PlanDraft;
pub use self::core::plan::PlanStatus;
pub use self::core::plan::PolicyArtifact;
pub use self::core::plan::PolicyArtifactKind;
pub use self::core::plan::PolicyControl;
pub use self::core::plan::RelatedTarget;
pub use self::core::plan::Relationship;
pub use self::core::plan::RiskLevel;
pub use self::core::plan::Strategy;
pub use self::core::plan::StrategyMode;
pub use self::core::plan::SuccessCriteria;
pub use error::CoreError;
pub use error::ErrorBody;
pub use error::ErrorKind;
