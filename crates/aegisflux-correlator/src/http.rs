// crates/aegisflux-correlator/src/http.rs
// ============================================================================
// Module: Correlator HTTP API
// Description: Findings, rules, overrides, metrics, and health endpoints.
// Purpose: Expose the correlator's stores over the operator HTTP surface.
// Dependencies: aegisflux-bus, aegisflux-core, axum, serde
// ============================================================================

//! ## Overview
//! The HTTP surface is read-mostly: findings queries, snapshot inspection,
//! and metrics, plus the two override mutations. Every error body is
//! `{error, timestamp}` with the status mapped from the error kind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_core::CoreError;
use aegisflux_core::ErrorBody;
use aegisflux_core::Finding;
use aegisflux_core::OverrideId;
use aegisflux_core::RuleId;
use aegisflux_core::Severity;
use aegisflux_core::core::time::now_unix_millis;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;

use crate::metrics::CorrelatorMetrics;
use crate::metrics::MetricsSnapshot;
use crate::overrides::OverrideManager;
use crate::overrides::OverrideRequest;
use crate::overrides::RuleOverride;
use crate::rules::loader::RuleLoader;
use crate::store::DEFAULT_QUERY_LIMIT;
use crate::store::FindingStore;

// ============================================================================
// SECTION: State and Errors
// ============================================================================

/// Shared state behind the HTTP surface.
pub struct ApiState {
    /// Bounded finding ring.
    pub store: Arc<FindingStore>,
    /// Active rule snapshot owner.
    pub loader: Arc<RuleLoader>,
    /// Runtime overrides.
    pub overrides: Arc<OverrideManager>,
    /// Pipeline counters.
    pub metrics: Arc<CorrelatorMetrics>,
    /// Bus handle for health reporting.
    pub bus: Arc<dyn Bus>,
}

/// Response wrapper mapping [`CoreError`] onto status + JSON body.
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the correlator router.
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/findings", get(get_findings))
        .route("/findings/reset", post(reset_findings))
        .route("/rules", get(get_rules))
        .route("/rules/overrides", post(add_override))
        .route("/rules/overrides/{id}", delete(remove_override))
        .route("/metrics", get(get_metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Query string for `GET /findings`.
#[derive(Debug, Default, Deserialize)]
struct FindingsQuery {
    /// Restrict to one host.
    host_id: Option<String>,
    /// Restrict to findings at or above this severity.
    severity: Option<String>,
    /// Maximum findings returned.
    limit: Option<usize>,
}

/// Lists findings newest-first with optional filters.
async fn get_findings(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<FindingsQuery>,
) -> Result<Json<Vec<Finding>>, ApiError> {
    let severity = match &query.severity {
        Some(raw) => Some(Severity::from_str(raw)?),
        None => None,
    };
    let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
    Ok(Json(state.store.query(query.host_id.as_deref(), severity, limit)))
}

/// Body returned by `POST /findings/reset`.
#[derive(Debug, Serialize)]
struct ResetResponse {
    /// Findings removed from the ring.
    cleared: usize,
}

/// Clears the finding ring.
async fn reset_findings(State(state): State<Arc<ApiState>>) -> Json<ResetResponse> {
    Json(ResetResponse {
        cleared: state.store.reset(),
    })
}

// ============================================================================
// SECTION: Rules and Overrides
// ============================================================================

/// One rule as reported by `GET /rules`.
#[derive(Debug, Serialize)]
struct RuleView {
    /// Rule identifier.
    rule_id: RuleId,
    /// Rule description.
    description: String,
    /// Effective enabled flag (override applied).
    enabled: bool,
    /// Base severity from the rule file.
    severity: Severity,
    /// True when a live override targets the rule.
    override_active: bool,
}

/// Body returned by `GET /rules`.
#[derive(Debug, Serialize)]
struct RulesResponse {
    /// Active snapshot version token.
    version: String,
    /// Snapshot load time as unix milliseconds.
    loaded_at: i64,
    /// Rules in snapshot order.
    rules: Vec<RuleView>,
}

/// Reports the active snapshot with per-rule override status.
async fn get_rules(State(state): State<Arc<ApiState>>) -> Json<RulesResponse> {
    let snapshot = state.loader.snapshot();
    let now = now_unix_millis();
    let rules = snapshot
        .rules
        .iter()
        .map(|compiled| {
            let rule = &compiled.rule;
            let active = state.overrides.effective_for(&rule.rule_id, now);
            RuleView {
                rule_id: rule.rule_id.clone(),
                description: rule.description.clone(),
                enabled: active.as_ref().and_then(|o| o.enabled).unwrap_or(rule.enabled),
                severity: rule.outcome.severity,
                override_active: active.is_some(),
            }
        })
        .collect();
    Json(RulesResponse {
        version: snapshot.version.clone(),
        loaded_at: snapshot.loaded_at,
        rules,
    })
}

/// Adds a runtime override.
async fn add_override(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<OverrideRequest>,
) -> Result<(StatusCode, Json<RuleOverride>), ApiError> {
    let record = state.overrides.add(request)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Removes an override; idempotent.
async fn remove_override(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> StatusCode {
    let _ = state.overrides.remove(&OverrideId::new(id));
    StatusCode::NO_CONTENT
}

// ============================================================================
// SECTION: Metrics and Health
// ============================================================================

/// Reports pipeline counters as JSON.
async fn get_metrics(State(state): State<Arc<ApiState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Health body for `/healthz` and `/readyz`.
#[derive(Debug, Serialize)]
struct HealthResponse {
    /// `ok` or `degraded`.
    status: &'static str,
}

/// Liveness: transport accepting and bus connected.
async fn healthz(State(state): State<Arc<ApiState>>) -> Response {
    if state.bus.connected() {
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

/// Readiness: bus connected and a rule snapshot loaded.
async fn readyz(State(state): State<Arc<ApiState>>) -> Response {
    if state.bus.connected() && state.loader.snapshot().loaded_at > 0 {
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
