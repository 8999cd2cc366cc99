// crates/aegisflux-registry/src/http.rs
// ============================================================================
// Module: Registry HTTP API
// Description: Agent, artifact, bundle, and assignment endpoints.
// Purpose: Expose the registry stores over the operator HTTP surface.
// Dependencies: aegisflux-core, axum, base64, serde
// ============================================================================

//! ## Overview
//! Registration endpoints run the two-step challenge; artifact endpoints
//! wrap the filesystem store (binary downloads stream
//! `application/octet-stream` with an `<id>.tar.zst` filename); bundle and
//! assignment endpoints wrap the in-memory store. Errors are always
//! `{error, timestamp}` bodies with the kind-mapped status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use aegisflux_core::Agent;
use aegisflux_core::AgentUid;
use aegisflux_core::Artifact;
use aegisflux_core::ArtifactId;
use aegisflux_core::CoreError;
use aegisflux_core::DEFAULT_HASH_ALGORITHM;
use aegisflux_core::ErrorBody;
use aegisflux_core::HostId;
use aegisflux_core::core::hashing::hash_bytes;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::Serialize;

use crate::agents::AgentRegistry;
use crate::agents::CompleteRequest;
use crate::agents::CompleteResponse;
use crate::agents::InitRequest;
use crate::agents::InitResponse;
use crate::artifacts::ArtifactStore;
use crate::artifacts::ArtifactUpload;
use crate::assignments::Assignment;
use crate::assignments::AssignmentStore;

// ============================================================================
// SECTION: State and Errors
// ============================================================================

/// Shared state behind the HTTP surface.
pub struct ApiState {
    /// Agent registry.
    pub agents: AgentRegistry,
    /// Filesystem artifact store.
    pub artifacts: ArtifactStore,
    /// Assignment and bundle store.
    pub assignments: AssignmentStore,
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

/// Builds the registry router.
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/agents/register/init", post(register_init))
        .route("/agents/register/complete", post(register_complete))
        .route("/agents", get(list_agents))
        .route("/agents/{uid}", get(get_agent))
        .route("/agents/{uid}/labels", put(put_labels))
        .route("/agents/{uid}/note", put(put_note))
        .route("/artifacts", post(upload_artifact).get(list_artifacts))
        .route("/artifacts/binary/{id}", get(download_artifact))
        .route("/artifacts/for-host/{host_id}", get(artifacts_for_host))
        .route("/artifacts/{id}", get(get_artifact))
        .route("/bundles/{aid}", get(download_bundle).post(upload_bundle))
        .route("/admin/assign", post(admin_assign))
        .route("/healthz", get(healthz))
        .route("/readyz", get(healthz))
        .with_state(state)
}

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Starts a registration challenge.
async fn register_init(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<InitRequest>,
) -> Result<Json<InitResponse>, ApiError> {
    Ok(Json(state.agents.init(request)?))
}

/// Completes a registration challenge.
async fn register_complete(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, ApiError> {
    Ok(Json(state.agents.complete(request)?))
}

// ============================================================================
// SECTION: Agents
// ============================================================================

/// Query string for `GET /agents`.
#[derive(Debug, Default, Deserialize)]
struct AgentsQuery {
    /// Restrict to agents carrying this label.
    label: Option<String>,
}

/// Lists registered agents.
async fn list_agents(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<AgentsQuery>,
) -> Json<Vec<Agent>> {
    Json(state.agents.list(query.label.as_deref()))
}

/// Returns one agent.
async fn get_agent(
    State(state): State<Arc<ApiState>>,
    Path(uid): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    state
        .agents
        .get(&AgentUid::new(uid.clone()))
        .map(Json)
        .ok_or_else(|| CoreError::NotFound(format!("agent {uid}")).into())
}

/// Body for `PUT /agents/{uid}/labels`.
#[derive(Debug, Deserialize)]
struct LabelsRequest {
    /// Replacement label set.
    labels: BTreeSet<String>,
}

/// Replaces an agent's labels.
async fn put_labels(
    State(state): State<Arc<ApiState>>,
    Path(uid): Path<String>,
    Json(request): Json<LabelsRequest>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(state.agents.set_labels(&AgentUid::new(uid), request.labels)?))
}

/// Body for `PUT /agents/{uid}/note`.
#[derive(Debug, Deserialize)]
struct NoteRequest {
    /// Replacement note; null clears it.
    note: Option<String>,
}

/// Replaces an agent's note.
async fn put_note(
    State(state): State<Arc<ApiState>>,
    Path(uid): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(state.agents.set_note(&AgentUid::new(uid), request.note)?))
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Body for `POST /artifacts`.
#[derive(Debug, Deserialize)]
struct UploadArtifactRequest {
    /// Explicit artifact id; derived from the checksum when absent.
    id: Option<String>,
    /// Descriptive fields.
    #[serde(flatten)]
    upload: ArtifactUpload,
    /// Base64 artifact bytes.
    bytes_b64: String,
}

/// Stores a signed artifact.
async fn upload_artifact(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UploadArtifactRequest>,
) -> Result<(StatusCode, Json<Artifact>), ApiError> {
    let bytes = STANDARD
        .decode(request.bytes_b64.as_bytes())
        .map_err(|err| CoreError::InvalidInput(format!("bytes_b64 is not base64: {err}")))?;
    let id = match request.id {
        Some(id) if !id.is_empty() => ArtifactId::new(id),
        _ => content_address(&bytes),
    };
    let artifact = state.artifacts.put(id, &bytes, request.upload).await?;
    Ok((StatusCode::CREATED, Json(artifact)))
}

/// Derives a content-addressed id from the bytes.
fn content_address(bytes: &[u8]) -> ArtifactId {
    ArtifactId::new(&hash_bytes(DEFAULT_HASH_ALGORITHM, bytes).value[.. 16])
}

/// Lists stored artifacts.
async fn list_artifacts(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<Artifact>>, ApiError> {
    Ok(Json(state.artifacts.list().await?))
}

/// Returns one artifact record.
async fn get_artifact(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Artifact>, ApiError> {
    Ok(Json(state.artifacts.get_metadata(&ArtifactId::new(id)).await?))
}

/// Streams artifact bytes as an octet-stream attachment.
async fn download_artifact(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let artifact_id = ArtifactId::new(id);
    let (bytes, _) = state.artifacts.get(&artifact_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{artifact_id}.tar.zst\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Lists artifacts relevant to a host: hosts-scoped records plus assigned
/// artifacts.
async fn artifacts_for_host(
    State(state): State<Arc<ApiState>>,
    Path(host_id): Path<String>,
) -> Result<Json<Vec<Artifact>>, ApiError> {
    let mut artifacts = state.artifacts.for_host(&host_id).await?;
    for assignment in state.assignments.for_host(&HostId::new(host_id)) {
        if artifacts.iter().all(|artifact| artifact.id != assignment.artifact_id)
            && let Ok(artifact) = state.artifacts.get_metadata(&assignment.artifact_id).await
        {
            artifacts.push(artifact);
        }
    }
    Ok(Json(artifacts))
}

// ============================================================================
// SECTION: Bundles and Assignments
// ============================================================================

/// Body for `POST /bundles/{aid}`.
#[derive(Debug, Deserialize)]
struct UploadBundleRequest {
    /// Base64 bundle bytes.
    bytes_b64: String,
}

/// Stores bundle bytes for an artifact.
async fn upload_bundle(
    State(state): State<Arc<ApiState>>,
    Path(aid): Path<String>,
    Json(request): Json<UploadBundleRequest>,
) -> Result<StatusCode, ApiError> {
    let bytes = STANDARD
        .decode(request.bytes_b64.as_bytes())
        .map_err(|err| CoreError::InvalidInput(format!("bytes_b64 is not base64: {err}")))?;
    state.assignments.put_bundle(ArtifactId::new(aid), bytes);
    Ok(StatusCode::NO_CONTENT)
}

/// Streams bundle bytes verbatim.
async fn download_bundle(
    State(state): State<Arc<ApiState>>,
    Path(aid): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state
        .assignments
        .get_bundle(&ArtifactId::new(aid.clone()))
        .ok_or_else(|| CoreError::NotFound(format!("bundle {aid}")))?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream".to_string())],
        bytes,
    )
        .into_response())
}

/// Body for `POST /admin/assign`.
#[derive(Debug, Deserialize)]
struct AssignRequest {
    /// Target host.
    host_id: String,
    /// Artifact to assign.
    artifact_id: String,
    /// Principal making the assignment.
    assigned_by: Option<String>,
}

/// Records a (host, artifact) assignment.
async fn admin_assign(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AssignRequest>,
) -> Result<(StatusCode, Json<Assignment>), ApiError> {
    if request.host_id.is_empty() || request.artifact_id.is_empty() {
        return Err(CoreError::InvalidInput(
            "host_id and artifact_id are required".to_string(),
        )
        .into());
    }
    let assignment = state.assignments.assign(
        HostId::new(request.host_id),
        ArtifactId::new(request.artifact_id),
        request.assigned_by,
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

// ============================================================================
// SECTION: Health
// ============================================================================

/// Health body.
#[derive(Debug, Serialize)]
struct HealthResponse {
    /// Always `ok` while the process serves requests.
    status: &'static str,
}

/// Liveness and readiness; the registry has no external dependencies.
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
    })
}
