// crates/aegisflux-registry/src/agents.rs
// ============================================================================
// Module: Agent Registry
// Description: Two-step challenge/response identity bootstrap.
// Purpose: Verify agent keys and maintain the registered-agent set.
// Dependencies: aegisflux-core, base64, ed25519-dalek, parking_lot, rand
// ============================================================================

//! ## Overview
//! `init` validates the claimed Ed25519 public key (exactly 32 bytes after
//! base64 decode), mints a 32-byte nonce and an RFC 3339 server time, and
//! stores a single-use [`PendingRegistration`]. `complete` verifies the
//! agent's signature over `nonce || server_time || host_id` under the
//! claimed key; success promotes the record into an [`Agent`] and deletes
//! the pending entry, so a registration id can never complete twice.
//! Error mapping: malformed input 400, unknown registration 404, signature
//! failure 401.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;

use aegisflux_core::Agent;
use aegisflux_core::AgentUid;
use aegisflux_core::CoreError;
use aegisflux_core::HostId;
use aegisflux_core::PendingRegistration;
use aegisflux_core::RegistrationId;
use aegisflux_core::core::agent::ED25519_PUBLIC_KEY_LEN;
use aegisflux_core::core::agent::REGISTRATION_NONCE_LEN;
use aegisflux_core::core::time::now_rfc3339;
use aegisflux_core::core::time::now_unix_millis;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::Signature;
use ed25519_dalek::VerifyingKey;
use parking_lot::Mutex;
use parking_lot::RwLock;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Body for `POST /agents/register/init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRequest {
    /// Host the agent runs on.
    pub host_id: HostId,
    /// Organization the agent belongs to.
    #[serde(default)]
    pub org_id: String,
    /// Base64 Ed25519 public key.
    pub public_key: String,
    /// Capability strings advertised by the agent.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Platform facts.
    #[serde(default)]
    pub platform: BTreeMap<String, String>,
    /// Network facts.
    #[serde(default)]
    pub network: BTreeMap<String, String>,
}

/// Body returned by `POST /agents/register/init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    /// Identifier of the pending registration.
    pub registration_id: RegistrationId,
    /// Base64 challenge nonce.
    pub nonce: String,
    /// RFC 3339 server time covered by the signature.
    pub server_time: String,
}

/// Body for `POST /agents/register/complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRequest {
    /// Identifier returned at init.
    pub registration_id: RegistrationId,
    /// Host the agent runs on; must match the init claim.
    pub host_id: HostId,
    /// Base64 Ed25519 signature over `nonce || server_time || host_id`.
    pub signature: String,
}

/// Body returned by `POST /agents/register/complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteResponse {
    /// Minted agent identifier.
    pub agent_uid: AgentUid,
    /// Opaque bootstrap token for the agent's first authenticated calls.
    pub bootstrap_token: String,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// In-memory agent registry with pending challenges.
#[derive(Default)]
pub struct AgentRegistry {
    /// Single-use pending registrations keyed by registration id.
    pending: Mutex<HashMap<RegistrationId, PendingRegistration>>,
    /// Registered agents keyed by uid.
    agents: RwLock<HashMap<AgentUid, Agent>>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a registration challenge.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when the public key is not
    /// base64 or does not decode to exactly 32 bytes.
    pub fn init(&self, request: InitRequest) -> Result<InitResponse, CoreError> {
        let key_bytes = STANDARD
            .decode(request.public_key.as_bytes())
            .map_err(|err| CoreError::InvalidInput(format!("public key is not base64: {err}")))?;
        if key_bytes.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(CoreError::InvalidInput(format!(
                "public key must decode to {ED25519_PUBLIC_KEY_LEN} bytes, got {}",
                key_bytes.len()
            )));
        }
        if request.host_id.as_str().is_empty() {
            return Err(CoreError::InvalidInput("host_id must not be empty".to_string()));
        }

        let mut nonce = vec![0u8; REGISTRATION_NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let pending = PendingRegistration {
            registration_id: RegistrationId::random(),
            nonce,
            server_time: now_rfc3339(),
            public_key: request.public_key,
            host_id: request.host_id,
            org_id: request.org_id,
            capabilities: request.capabilities,
            platform: request.platform,
            network: request.network,
            created_at: now_unix_millis(),
        };
        let response = InitResponse {
            registration_id: pending.registration_id.clone(),
            nonce: STANDARD.encode(&pending.nonce),
            server_time: pending.server_time.clone(),
        };
        self.pending.lock().insert(pending.registration_id.clone(), pending);
        Ok(response)
    }

    /// Completes a registration challenge.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown or already-consumed
    /// registration ids, [`CoreError::InvalidInput`] for malformed
    /// signatures or a host mismatch, and [`CoreError::Unauthorized`] when
    /// verification fails.
    pub fn complete(&self, request: CompleteRequest) -> Result<CompleteResponse, CoreError> {
        let pending = self
            .pending
            .lock()
            .get(&request.registration_id)
            .cloned()
            .ok_or_else(|| {
                CoreError::NotFound(format!("registration {}", request.registration_id))
            })?;
        if request.host_id != pending.host_id {
            return Err(CoreError::InvalidInput(format!(
                "host {} does not match the registration claim",
                request.host_id
            )));
        }

        let signature_bytes = STANDARD
            .decode(request.signature.as_bytes())
            .map_err(|err| CoreError::InvalidInput(format!("signature is not base64: {err}")))?;
        let signature_array: [u8; 64] = signature_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidInput("signature must be 64 bytes".to_string()))?;
        let key_bytes = STANDARD
            .decode(pending.public_key.as_bytes())
            .map_err(|err| CoreError::Internal(format!("stored key undecodable: {err}")))?;
        let key_array: [u8; ED25519_PUBLIC_KEY_LEN] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::Internal("stored key has the wrong length".to_string()))?;
        let verifying_key = VerifyingKey::from_bytes(&key_array)
            .map_err(|err| CoreError::Unauthorized(format!("public key rejected: {err}")))?;

        verifying_key
            .verify_strict(&pending.challenge_bytes(), &Signature::from_bytes(&signature_array))
            .map_err(|_| CoreError::Unauthorized("challenge signature did not verify".to_string()))?;

        // Single-use: consume the pending record only after verification.
        self.pending.lock().remove(&request.registration_id);

        let now = now_unix_millis();
        let agent = Agent {
            agent_uid: AgentUid::random(),
            org_id: pending.org_id,
            host_id: pending.host_id,
            public_key: pending.public_key,
            capabilities: pending.capabilities,
            platform: pending.platform,
            network: pending.network,
            labels: BTreeSet::new(),
            note: None,
            created_at: now,
            last_seen: now,
        };
        let mut token = vec![0u8; 32];
        OsRng.fill_bytes(&mut token);
        let response = CompleteResponse {
            agent_uid: agent.agent_uid.clone(),
            bootstrap_token: STANDARD.encode(&token),
        };
        self.agents.write().insert(agent.agent_uid.clone(), agent);
        Ok(response)
    }

    /// Lists agents, optionally restricted to a label.
    #[must_use]
    pub fn list(&self, label: Option<&str>) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self
            .agents
            .read()
            .values()
            .filter(|agent| label.is_none_or(|wanted| agent.labels.contains(wanted)))
            .cloned()
            .collect();
        agents.sort_by(|a, b| a.agent_uid.cmp(&b.agent_uid));
        agents
    }

    /// Returns one agent by uid.
    #[must_use]
    pub fn get(&self, uid: &AgentUid) -> Option<Agent> {
        self.agents.read().get(uid).cloned()
    }

    /// Replaces an agent's labels.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown uids.
    pub fn set_labels(&self, uid: &AgentUid, labels: BTreeSet<String>) -> Result<Agent, CoreError> {
        let mut agents = self.agents.write();
        let agent =
            agents.get_mut(uid).ok_or_else(|| CoreError::NotFound(format!("agent {uid}")))?;
        agent.labels = labels;
        agent.last_seen = now_unix_millis();
        Ok(agent.clone())
    }

    /// Replaces an agent's note.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown uids.
    pub fn set_note(&self, uid: &AgentUid, note: Option<String>) -> Result<Agent, CoreError> {
        let mut agents = self.agents.write();
        let agent =
            agents.get_mut(uid).ok_or_else(|| CoreError::NotFound(format!("agent {uid}")))?;
        agent.note = note;
        agent.last_seen = now_unix_millis();
        Ok(agent.clone())
    }

    /// Returns the number of pending registrations.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}
