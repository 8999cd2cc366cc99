// crates/aegisflux-ingest/src/http.rs
// ============================================================================
// Module: Ingest Health Surface
// Description: Liveness, readiness, and counter endpoints.
// Purpose: Report transport and bus health beside the gRPC listener.
// Dependencies: aegisflux-bus, axum, serde
// ============================================================================

//! ## Overview
//! Readiness holds iff the schema compiled (state construction implies it)
//! and the bus connection is up. Health holds iff the transport is accepting
//! and the bus connection is up. Both endpoints stay functional while the
//! gRPC listener drains.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde::Serialize;

use crate::metrics::MetricsSnapshot;
use crate::server::IngestState;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the ingest health router.
#[must_use]
pub fn router(state: Arc<IngestState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Health body for `/healthz` and `/readyz`.
#[derive(Debug, Serialize)]
struct HealthResponse {
    /// `ok` or `degraded`.
    status: &'static str,
}

/// Renders a health verdict.
fn verdict(up: bool) -> Response {
    if up {
        Json(HealthResponse {
            status: "ok",
        })
        .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
            }),
        )
            .into_response()
    }
}

/// Liveness: transport accepting and bus connected.
async fn healthz(State(state): State<Arc<IngestState>>) -> Response {
    verdict(state.bus.connected())
}

/// Readiness: schema compiled and bus connected.
async fn readyz(State(state): State<Arc<IngestState>>) -> Response {
    verdict(state.bus.connected())
}

/// Reports stream counters as JSON.
async fn get_metrics(State(state): State<Arc<IngestState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
