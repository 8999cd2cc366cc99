// crates/aegisflux-decision/src/http.rs
// ============================================================================
// Module: Decision HTTP API
// Description: Plan creation, stage endpoints, and guardrail queries.
// Purpose: Expose the pipeline and plan store over HTTP.
// Dependencies: aegisflux-config, aegisflux-core, axum, serde
// ============================================================================

//! ## Overview
//! `POST /plans` accepts either an inline finding or a `finding_id`
//! resolving against the recent-findings cache; at least one is required.
//! The stage endpoints (`/plans/draft`, `/plans/policy`,
//! `/targets/segment`, `/plans/explain`, `/guardrails/strategy`) expose the
//! deterministic stage paths for tooling and operators. Errors are always
//! `{error, timestamp}` bodies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use aegisflux_bus::Bus;
use aegisflux_core::ControlIntent;
use aegisflux_core::CoreError;
use aegisflux_core::ErrorBody;
use aegisflux_core::Finding;
use aegisflux_core::FindingId;
use aegisflux_core::GuardrailDecision;
use aegisflux_core::Plan;
use aegisflux_core::PlanDraft;
use aegisflux_core::PlanId;
use aegisflux_core::PlanStatus;
use aegisflux_core::PolicyControl;
use aegisflux_core::RelatedTarget;
use aegisflux_core::StrategyMode;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::explain::redact_secrets;
use crate::explain::template_explanation;
use crate::guardrails::GuardrailsConfig;
use crate::guardrails::decide_strategy;
use crate::pipeline::DecisionPipeline;
use crate::planner::Planner;
use crate::policy::PolicyWriter;
use crate::segment::Segmenter;

// ============================================================================
// SECTION: State and Errors
// ============================================================================

/// Shared state behind the HTTP surface.
pub struct ApiState {
    /// The pipeline (owns store, config, and the recent-findings cache).
    pub pipeline: Arc<DecisionPipeline>,
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

/// Builds the decision router.
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/plans", post(create_plan).get(list_plans))
        .route("/plans/draft", post(draft_plan))
        .route("/plans/policy", post(compile_policy))
        .route("/plans/explain", post(explain_plan))
        .route("/plans/{id}", get(get_plan))
        .route("/targets/segment", post(segment_targets))
        .route("/guardrails/strategy", post(guardrails_strategy))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}

// ============================================================================
// SECTION: Plan Creation
// ============================================================================

/// Body for `POST /plans`.
#[derive(Debug, Deserialize)]
struct CreatePlanRequest {
    /// Identifier of a recently seen finding.
    finding_id: Option<String>,
    /// Inline finding snapshot.
    finding: Option<Finding>,
    /// Desired strategy override.
    strategy_mode: Option<String>,
    /// Caller metadata; recorded but not interpreted.
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// Body returned by `POST /plans`.
#[derive(Debug, Serialize)]
struct CreatePlanResponse {
    /// The assembled plan.
    plan: Plan,
    /// Human-readable status.
    message: String,
}

/// Creates a plan from an inline finding or a recent finding id.
async fn create_plan(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<CreatePlanResponse>), ApiError> {
    let desired = match &request.strategy_mode {
        Some(raw) => Some(StrategyMode::from_str(raw)?),
        None => None,
    };
    let finding = match (request.finding, &request.finding_id) {
        (Some(finding), _) => finding,
        (None, Some(id)) => state
            .pipeline
            .recent_finding(&FindingId::new(id.clone()))
            .ok_or_else(|| CoreError::NotFound(format!("finding {id}")))?,
        (None, None) => {
            return Err(CoreError::InvalidInput(
                "one of finding or finding_id is required".to_string(),
            )
            .into());
        }
    };
    if !request.metadata.is_empty() {
        tracing::debug!(keys = request.metadata.len(), "plan request metadata received");
    }
    let plan = state.pipeline.create_plan(finding, desired).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePlanResponse {
            plan,
            message: "plan created".to_string(),
        }),
    ))
}

/// Query string for `GET /plans`.
#[derive(Debug, Default, Deserialize)]
struct ListPlansQuery {
    /// Restrict to one lifecycle status.
    status: Option<PlanStatus>,
    /// Maximum plans returned.
    limit: Option<usize>,
}

/// Lists stored plans newest-first.
async fn list_plans(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListPlansQuery>,
) -> Json<Vec<Plan>> {
    Json(state.pipeline.store().list(query.status, query.limit.unwrap_or(100)))
}

/// Returns one plan by id.
async fn get_plan(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Plan>, ApiError> {
    state
        .pipeline
        .store()
        .get(&PlanId::new(id.clone()))
        .map(Json)
        .ok_or_else(|| CoreError::NotFound(format!("plan {id}")).into())
}

// ============================================================================
// SECTION: Stage Endpoints
// ============================================================================

/// Body for `POST /plans/draft`.
#[derive(Debug, Deserialize)]
struct DraftRequest {
    /// Finding to draft for.
    finding: Finding,
    /// Desired strategy override.
    strategy_mode: Option<String>,
}

/// Runs the deterministic draft stage.
async fn draft_plan(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<DraftRequest>,
) -> Result<Json<PlanDraft>, ApiError> {
    let desired = match &request.strategy_mode {
        Some(raw) => StrategyMode::from_str(raw)?,
        None => state.pipeline.config().current().decision_mode,
    };
    Ok(Json(Planner::fallback_draft(&request.finding, desired)))
}

/// Body for `POST /plans/policy`.
#[derive(Debug, Deserialize)]
struct PolicyRequest {
    /// Finding providing scope context.
    finding: Finding,
    /// Intents to compile.
    intents: Vec<ControlIntent>,
}

/// Runs the policy compile stage.
async fn compile_policy(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PolicyRequest>,
) -> Json<Vec<PolicyControl>> {
    let default_ttl = state.pipeline.config().current().default_ttl_seconds;
    Json(PolicyWriter::new().compile(&request.finding, &request.intents, default_ttl))
}

/// Body for `POST /targets/segment`.
#[derive(Debug, Deserialize)]
struct SegmentRequest {
    /// Primary target to expand.
    target: String,
    /// Maximum related targets.
    limit: Option<usize>,
}

/// Runs the deterministic segmentation fallback.
async fn segment_targets(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SegmentRequest>,
) -> Json<Vec<RelatedTarget>> {
    let limit = request.limit.unwrap_or_else(|| {
        usize::try_from(state.pipeline.config().current().max_canary_hosts).unwrap_or(usize::MAX)
    });
    let mut related = Segmenter::fallback_related(&request.target);
    related.sort_by(|a, b| {
        (b.risk_score * b.confidence)
            .partial_cmp(&(a.risk_score * a.confidence))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    related.truncate(limit);
    Json(related)
}

/// Body for `POST /plans/explain`.
#[derive(Debug, Deserialize)]
struct ExplainRequest {
    /// Assembled plan to explain.
    plan: Plan,
}

/// Body returned by `POST /plans/explain`.
#[derive(Debug, Serialize)]
struct ExplainResponse {
    /// Redacted explanation text.
    explanation: String,
}

/// Runs the template explanation stage.
async fn explain_plan(Json(request): Json<ExplainRequest>) -> Json<ExplainResponse> {
    let rendered = template_explanation(&request.plan);
    Json(ExplainResponse {
        explanation: redact_secrets(&rendered),
    })
}

/// Body for `POST /guardrails/strategy`.
#[derive(Debug, Deserialize)]
struct StrategyRequest {
    /// Desired strategy.
    desired: String,
    /// Number of rollout targets.
    num_targets: u32,
    /// Labels of the affected hosts.
    #[serde(default)]
    host_labels: Vec<String>,
}

/// Runs the guardrails decider against live config.
async fn guardrails_strategy(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<StrategyRequest>,
) -> Result<Json<GuardrailDecision>, ApiError> {
    let desired = StrategyMode::from_str(&request.desired)?;
    let snapshot = state.pipeline.config().current();
    let config = GuardrailsConfig::load(&snapshot);
    let decision = decide_strategy(
        desired,
        request.num_targets,
        &request.host_labels,
        &config,
        OffsetDateTime::now_utc().hour(),
    );
    Ok(Json(decision))
}

// ============================================================================
// SECTION: Health
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
async fn healthz(State(state): State<Arc<ApiState>>) -> Response {
    verdict(state.bus.connected())
}

/// Readiness: bus connected (config always has at least env defaults).
async fn readyz(State(state): State<Arc<ApiState>>) -> Response {
    verdict(state.bus.connected())
}
