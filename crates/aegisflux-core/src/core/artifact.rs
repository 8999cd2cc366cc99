// crates/aegisflux-core/src/core/artifact.rs
// ============================================================================
// Module: AegisFlux Artifacts
// Description: Signed artifact records and their on-disk metadata mirror.
// Purpose: Provide artifact records with lossless metadata round-trips.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! An [`Artifact`] is a signed bundle stored content-addressed on disk as
//! `<root>/<id>/artifact.tar.zst` plus `metadata.json`. [`ArtifactMetadata`]
//! mirrors the JSON file exactly, with timestamps as RFC 3339 strings at
//! nanosecond precision; converting to metadata and back reproduces the
//! artifact on every represented field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ArtifactId;
use crate::core::time::TimeParseError;
use crate::core::time::format_rfc3339;
use crate::core::time::parse_rfc3339;

// ============================================================================
// SECTION: Artifact Record
// ============================================================================

/// A signed, content-addressed artifact.
///
/// # Invariants
/// - `checksum` is the lowercase hex SHA-256 of the stored bytes.
/// - `size` matches the stored byte length.
/// - `signature` is present once the store's signer has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Human-readable name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Artifact type, e.g. `ebpf_bundle`.
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Target CPU architecture.
    #[serde(default)]
    pub architecture: String,
    /// Target kernel version constraint.
    #[serde(default)]
    pub kernel_version: String,
    /// Classification tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Hosts the artifact is intended for, when scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    /// Detached signature over the stored bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Stored byte length.
    pub size: u64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub checksum: String,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Creation time as unix milliseconds.
    pub created_at: i64,
    /// Last update time as unix milliseconds.
    pub updated_at: i64,
}

impl Artifact {
    /// Converts the artifact into its on-disk metadata mirror.
    ///
    /// # Errors
    ///
    /// Returns [`TimeParseError`] when a timestamp does not map onto a
    /// representable date.
    pub fn to_metadata(&self) -> Result<ArtifactMetadata, TimeParseError> {
        Ok(ArtifactMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            artifact_type: self.artifact_type.clone(),
            architecture: self.architecture.clone(),
            kernel_version: self.kernel_version.clone(),
            created_at: format_rfc3339(self.created_at)?,
            updated_at: format_rfc3339(self.updated_at)?,
            size: self.size,
            checksum: self.checksum.clone(),
            signature: self.signature.clone(),
            metadata: self.metadata.clone(),
            tags: self.tags.clone(),
            hosts: self.hosts.clone(),
        })
    }
}

// ============================================================================
// SECTION: Metadata Mirror
// ============================================================================

/// The `metadata.json` mirror of an [`Artifact`].
///
/// # Invariants
/// - `created_at`/`updated_at` are RFC 3339 strings; round-tripping through
///   [`ArtifactMetadata::into_artifact`] is lossless at millisecond wire
///   precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Human-readable name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Artifact type.
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Target CPU architecture.
    #[serde(default)]
    pub architecture: String,
    /// Target kernel version constraint.
    #[serde(default)]
    pub kernel_version: String,
    /// Creation time as RFC 3339.
    pub created_at: String,
    /// Last update time as RFC 3339.
    pub updated_at: String,
    /// Stored byte length.
    pub size: u64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub checksum: String,
    /// Detached signature over the stored bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Classification tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Hosts the artifact is intended for, when scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
}

impl ArtifactMetadata {
    /// Converts the metadata mirror back into an [`Artifact`].
    ///
    /// # Errors
    ///
    /// Returns [`TimeParseError`] when a timestamp string does not parse.
    pub fn into_artifact(self) -> Result<Artifact, TimeParseError> {
        Ok(Artifact {
            id: self.id,
            name: self.name,
            version: self.version,
            description: self.description,
            artifact_type: self.artifact_type,
            architecture: self.architecture,
            kernel_version: self.kernel_version,
            created_at: parse_rfc3339(&self.created_at)?,
            updated_at: parse_rfc3339(&self.updated_at)?,
            size: self.size,
            checksum: self.checksum,
            signature: self.signature,
            metadata: self.metadata,
            tags: self.tags,
            hosts: self.hosts,
        })
    }
}
