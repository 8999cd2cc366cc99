// crates/aegisflux-ingest/src/lib.rs
// ============================================================================
// Module: AegisFlux Ingest Library
// Description: Schema-validated event ingestion onto the bus.
// Purpose: Provide the gRPC streaming endpoint and its validation core.
// Dependencies: aegisflux-bus, aegisflux-core, jsonschema, prost, tonic
// ============================================================================

//! ## Overview
//! Ingest accepts `PostEvents` streams, validates every event against the
//! compile-once JSON schema, and publishes accepted events to `events.raw`
//! with the contract header set. A schema failure terminates the stream
//! with `INVALID_ARGUMENT`; a publish failure or timeout terminates it with
//! `UNAVAILABLE`. Nothing reaches the bus without passing validation first.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;
pub mod metrics;
pub mod schema;
pub mod server;

/// Generated gRPC contract types.
#[allow(missing_docs, reason = "generated protobuf/tonic code")]
pub mod proto {
    tonic::include_proto!("aegisflux.ingest.v1");
}

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use metrics::IngestMetrics;
pub use schema::SchemaValidator;
pub use server::IngestGrpc;
pub use server::IngestState;
pub use server::PUBLISH_TIMEOUT;
