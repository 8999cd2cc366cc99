// crates/aegisflux-ingest/src/server.rs
// ============================================================================
// Module: Ingest gRPC Server
// Description: PostEvents stream handler with validate-then-publish flow.
// Purpose: Admit schema-valid events onto `events.raw` with headers.
// Dependencies: aegisflux-bus, aegisflux-core, base64, bytes, tonic
// ============================================================================

//! ## Overview
//! Each streamed event is rendered to JSON, validated against the compiled
//! schema, and published to `events.raw` with headers `x-event-id`,
//! `x-event-type`, `x-event-source`, `x-timestamp`, and `x-host-id` (when
//! metadata carries one). The per-event publish deadline is
//! [`PUBLISH_TIMEOUT`]. The first schema failure terminates the stream with
//! `INVALID_ARGUMENT`; a publish failure or timeout terminates it with
//! `UNAVAILABLE`. End-of-stream acknowledges with
//! `Events processed successfully`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use aegisflux_bus::Bus;
use aegisflux_bus::EVENTS_RAW;
use aegisflux_bus::Headers;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::Value;
use serde_json::json;
use tonic::Request;
use tonic::Response;
use tonic::Status;
use tonic::Streaming;

use crate::metrics::IngestMetrics;
use crate::proto;
use crate::schema::SchemaValidator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Per-event publish deadline.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Acknowledgement message for a fully processed stream.
pub const ACK_MESSAGE: &str = "Events processed successfully";

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared ingest state behind the gRPC and health surfaces.
///
/// # Invariants
/// - `validator` compiled successfully; readiness reports on this.
pub struct IngestState {
    /// Compiled event schema.
    pub validator: SchemaValidator,
    /// Bus handle for publication.
    pub bus: Arc<dyn Bus>,
    /// Stream counters.
    pub metrics: Arc<IngestMetrics>,
}

impl IngestState {
    /// Validates one event and publishes it to `events.raw`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` for schema failures and `UNAVAILABLE` for
    /// publish failures or timeouts.
    pub async fn admit(&self, event: &proto::Event) -> Result<(), Status> {
        self.metrics.inc_received();
        let instance = event_to_json(event);
        if let Err(err) = self.validator.validate(&instance) {
            self.metrics.inc_invalid();
            return Err(Status::invalid_argument(err.to_string()));
        }
        self.metrics.inc_valid();

        let payload = Bytes::from(instance.to_string());
        let headers = event_headers(event);
        let publish = self.bus.publish_with_headers(EVENTS_RAW, headers, payload);
        match tokio::time::timeout(PUBLISH_TIMEOUT, publish).await {
            Ok(Ok(())) => {
                self.metrics.inc_published();
                Ok(())
            }
            Ok(Err(err)) => Err(Status::unavailable(format!("event publish failed: {err}"))),
            Err(_) => Err(Status::unavailable(format!(
                "event publish timed out after {}s",
                PUBLISH_TIMEOUT.as_secs()
            ))),
        }
    }
}

// ============================================================================
// SECTION: gRPC Service
// ============================================================================

/// gRPC adapter over [`IngestState`].
pub struct IngestGrpc {
    /// Shared ingest state.
    state: Arc<IngestState>,
}

impl IngestGrpc {
    /// Wraps shared state for service registration.
    #[must_use]
    pub const fn new(state: Arc<IngestState>) -> Self {
        Self {
            state,
        }
    }
}

#[tonic::async_trait]
impl proto::ingest_service_server::IngestService for IngestGrpc {
    async fn post_events(
        &self,
        request: Request<Streaming<proto::Event>>,
    ) -> Result<Response<proto::Ack>, Status> {
        let mut stream = request.into_inner();
        while let Some(event) = stream.message().await? {
            self.state.admit(&event).await?;
        }
        Ok(Response::new(proto::Ack {
            ok: true,
            message: ACK_MESSAGE.to_string(),
        }))
    }
}

// ============================================================================
// SECTION: Wire Helpers
// ============================================================================

/// Renders a proto event as the JSON instance carried on the bus.
fn event_to_json(event: &proto::Event) -> Value {
    let mut instance = json!({
        "id": event.id,
        "type": event.r#type,
        "source": event.source,
        "timestamp": event.timestamp,
    });
    if !event.metadata.is_empty()
        && let Some(object) = instance.as_object_mut()
    {
        object.insert("metadata".to_string(), json!(event.metadata));
    }
    if !event.payload.is_empty()
        && let Some(object) = instance.as_object_mut()
    {
        object.insert("payload".to_string(), json!(STANDARD.encode(&event.payload)));
    }
    instance
}

/// Builds the `events.raw` header set for one event.
fn event_headers(event: &proto::Event) -> Headers {
    let mut headers = Headers::new();
    headers.insert("x-event-id".to_string(), event.id.clone());
    headers.insert("x-event-type".to_string(), event.r#type.clone());
    headers.insert("x-event-source".to_string(), event.source.clone());
    headers.insert("x-timestamp".to_string(), event.timestamp.to_string());
    if let Some(host_id) = event.metadata.get("host_id") {
        headers.insert("x-host-id".to_string(), host_id.clone());
    }
    headers
}
