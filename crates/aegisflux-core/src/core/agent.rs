// crates/aegisflux-core/src/core/agent.rs
// ============================================================================
// Module: AegisFlux Agents
// Description: Registered agents and pending registration challenges.
// Purpose: Provide the registry's identity records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Agent identity bootstraps through a two-step challenge: `init` stores a
//! [`PendingRegistration`] with a fresh nonce, and `complete` verifies an
//! Ed25519 signature over `nonce || server_time || host_id` before promoting
//! the record into an [`Agent`]. Pending records are single-use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AgentUid;
use crate::core::identifiers::HostId;
use crate::core::identifiers::RegistrationId;

// ============================================================================
// SECTION: Agent Record
// ============================================================================

/// A registered host-resident agent.
///
/// # Invariants
/// - `public_key` is the base64 form of a 32-byte Ed25519 public key, exactly
///   as verified during registration.
/// - `labels` is a set; duplicates collapse on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Agent identifier minted at registration completion.
    pub agent_uid: AgentUid,
    /// Organization the agent belongs to.
    pub org_id: String,
    /// Host the agent runs on.
    pub host_id: HostId,
    /// Base64 Ed25519 public key verified at registration.
    pub public_key: String,
    /// Capability strings advertised by the agent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    /// Platform facts (os, kernel, arch).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform: BTreeMap<String, String>,
    /// Network facts (addresses, interfaces).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub network: BTreeMap<String, String>,
    /// Operator-managed labels.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub labels: BTreeSet<String>,
    /// Operator note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Registration time as unix milliseconds.
    pub created_at: i64,
    /// Last observed activity as unix milliseconds.
    pub last_seen: i64,
}

// ============================================================================
// SECTION: Pending Registration
// ============================================================================

/// Nonce length for registration challenges, in bytes.
pub const REGISTRATION_NONCE_LEN: usize = 32;

/// Ed25519 public key length after base64 decode, in bytes.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// A short-lived registration challenge awaiting completion.
///
/// # Invariants
/// - Single-use: deleted when completion succeeds.
/// - `nonce` is exactly [`REGISTRATION_NONCE_LEN`] random bytes.
/// - `server_time` is the RFC 3339 string returned to the caller at init;
///   the signature covers this exact string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    /// Registration identifier returned at init.
    pub registration_id: RegistrationId,
    /// Challenge nonce bytes.
    pub nonce: Vec<u8>,
    /// RFC 3339 server time string captured at init.
    pub server_time: String,
    /// Base64 public key claimed at init.
    pub public_key: String,
    /// Host the registration is for.
    pub host_id: HostId,
    /// Organization supplied at init.
    pub org_id: String,
    /// Capability strings supplied at init.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    /// Platform facts supplied at init.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform: BTreeMap<String, String>,
    /// Network facts supplied at init.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub network: BTreeMap<String, String>,
    /// Creation time as unix milliseconds.
    pub created_at: i64,
}

impl PendingRegistration {
    /// Returns the exact byte sequence the agent must sign:
    /// `nonce || server_time || host_id`.
    #[must_use]
    pub fn challenge_bytes(&self) -> Vec<u8> {
        let mut message =
            Vec::with_capacity(self.nonce.len() + self.server_time.len() + self.host_id.as_str().len());
        message.extend_from_slice(&self.nonce);
        message.extend_from_slice(self.server_time.as_bytes());
        message.extend_from_slice(self.host_id.as_str().as_bytes());
        message
    }
}
