// crates/aegisflux-bus/src/lib.rs
// ============================================================================
// Module: AegisFlux Bus Library
// Description: Subject-based publish/subscribe abstraction for the pipeline.
// Purpose: Keep the concrete bus client swappable behind one trait.
// Dependencies: async-nats, async-trait, bytes, parking_lot, tokio
// ============================================================================

//! ## Overview
//! Every AegisFlux service talks to the message bus through the [`Bus`]
//! trait: publish with per-message header maps, subject subscriptions with
//! wildcard support, queue groups for load sharing, and request/reply.
//! [`MemoryBus`] backs every test; [`NatsBus`] is the production client.
//! Invariants:
//! - Delivery is at-least-once; dedup belongs to consumers.
//! - A single subscriber observes one publisher's order for delivered
//!   messages; queue groups make no cross-instance ordering promise.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bus;
pub mod memory;
pub mod nats;
pub mod subject;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bus::Bus;
pub use bus::BusError;
pub use bus::DEFAULT_PUBLISH_TIMEOUT;
pub use bus::BusMessage;
pub use bus::BusSubscription;
pub use bus::Headers;
pub use memory::MemoryBus;
pub use nats::NatsBus;
pub use nats::NatsBusConfig;
pub use subject::CONFIG_CHANGED;
pub use subject::CORRELATOR_FINDINGS;
pub use subject::EVENTS_ENRICHED;
pub use subject::EVENTS_RAW;
pub use subject::PLANS_CREATED;
pub use subject::PLANS_DELETED;
pub use subject::PLANS_PROPOSED;
pub use subject::PLANS_UPDATED;
pub use subject::QUEUE_CORRELATOR;
pub use subject::QUEUE_DECISION;
pub use subject::subject_matches;
