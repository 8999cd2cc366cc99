// crates/aegisflux-registry/src/assignments.rs
// ============================================================================
// Module: Assignment Store
// Description: Host-to-artifact assignments and signed bundle blobs.
// Purpose: Record deployment intent and serve bundle bytes verbatim.
// Dependencies: aegisflux-core, parking_lot, serde
// ============================================================================

//! ## Overview
//! Assignments map a host to an ordered list of artifact pairings; bundle
//! storage maps an artifact id to opaque bytes. Upload accepts base64 over
//! the wire; retrieval returns the exact bytes that were uploaded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use aegisflux_core::ArtifactId;
use aegisflux_core::HostId;
use aegisflux_core::core::time::now_unix_millis;
use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Records
// ============================================================================

/// One (host, artifact) deployment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Target host.
    pub host_id: HostId,
    /// Assigned artifact.
    pub artifact_id: ArtifactId,
    /// Principal who made the assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<String>,
    /// Assignment time as unix milliseconds.
    pub assigned_at: i64,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-memory assignment and bundle store.
#[derive(Default)]
pub struct AssignmentStore {
    /// Ordered assignments per host.
    assignments: RwLock<HashMap<HostId, Vec<Assignment>>>,
    /// Bundle bytes per artifact.
    bundles: RwLock<HashMap<ArtifactId, Vec<u8>>>,
}

impl AssignmentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an assignment; re-assigning the same artifact refreshes it.
    pub fn assign(
        &self,
        host_id: HostId,
        artifact_id: ArtifactId,
        assigned_by: Option<String>,
    ) -> Assignment {
        let assignment = Assignment {
            host_id: host_id.clone(),
            artifact_id,
            assigned_by,
            assigned_at: now_unix_millis(),
        };
        let mut assignments = self.assignments.write();
        let list = assignments.entry(host_id).or_default();
        list.retain(|existing| existing.artifact_id != assignment.artifact_id);
        list.push(assignment.clone());
        assignment
    }

    /// Returns a host's assignments in assignment order.
    #[must_use]
    pub fn for_host(&self, host_id: &HostId) -> Vec<Assignment> {
        self.assignments.read().get(host_id).cloned().unwrap_or_default()
    }

    /// Stores bundle bytes for an artifact, replacing any previous blob.
    pub fn put_bundle(&self, artifact_id: ArtifactId, bytes: Vec<u8>) {
        self.bundles.write().insert(artifact_id, bytes);
    }

    /// Returns the stored bundle bytes for an artifact.
    #[must_use]
    pub fn get_bundle(&self, artifact_id: &ArtifactId) -> Option<Vec<u8>> {
        self.bundles.read().get(artifact_id).cloned()
    }
}
