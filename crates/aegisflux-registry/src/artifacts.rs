// crates/aegisflux-registry/src/artifacts.rs
// ============================================================================
// Module: Artifact Store
// Description: Content-addressed filesystem storage with mandatory signing.
// Purpose: Persist signed bundles as artifact.tar.zst plus metadata.json.
// Dependencies: aegisflux-core, tokio
// ============================================================================

//! ## Overview
//! Layout: `<root>/<id>/artifact.tar.zst` and `<root>/<id>/metadata.json`.
//! Every put runs the configured [`Signer`] over the bytes before anything
//! touches disk; there is no unsigned write path. [`DevSigner`] is the
//! deterministic development signer; production deployments must supply a
//! signer backed by their trust root or refuse to start.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use aegisflux_core::Artifact;
use aegisflux_core::ArtifactId;
use aegisflux_core::ArtifactMetadata;
use aegisflux_core::CoreError;
use aegisflux_core::DEFAULT_HASH_ALGORITHM;
use aegisflux_core::core::hashing::hash_bytes;
use aegisflux_core::core::hashing::hash_parts;
use aegisflux_core::core::time::now_unix_millis;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Stored bundle file name.
pub const ARTIFACT_FILE: &str = "artifact.tar.zst";

/// Stored metadata file name.
pub const METADATA_FILE: &str = "metadata.json";

// ============================================================================
// SECTION: Signer
// ============================================================================

/// Detached-signature provider for stored artifacts.
///
/// # Invariants
/// - Signing failures abort the put; artifacts are never stored unsigned.
pub trait Signer: Send + Sync {
    /// Signs artifact bytes, returning the detached signature string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] when the signing backend cannot
    /// be reached.
    fn sign(&self, bytes: &[u8]) -> Result<String, CoreError>;
}

/// Deterministic development signer.
///
/// # Invariants
/// - Identical bytes always produce identical signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevSigner;

impl Signer for DevSigner {
    fn sign(&self, bytes: &[u8]) -> Result<String, CoreError> {
        let digest = hash_parts(DEFAULT_HASH_ALGORITHM, &[b"aegisflux-dev-signer", bytes]);
        Ok(format!("dev:{}", digest.value))
    }
}

// ============================================================================
// SECTION: Upload Shape
// ============================================================================

/// Descriptive fields accompanying an artifact upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactUpload {
    /// Human-readable name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Artifact type, e.g. `ebpf_bundle`.
    #[serde(rename = "type", default)]
    pub artifact_type: String,
    /// Target CPU architecture.
    #[serde(default)]
    pub architecture: String,
    /// Target kernel version constraint.
    #[serde(default)]
    pub kernel_version: String,
    /// Classification tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Hosts the artifact is intended for, when scoped.
    #[serde(default)]
    pub hosts: Option<Vec<String>>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Content-addressed filesystem artifact store.
///
/// # Invariants
/// - `metadata.json` always describes the sibling `artifact.tar.zst`.
pub struct ArtifactStore {
    /// Storage root directory.
    root: PathBuf,
    /// Mandatory signer; there is no unsigned path.
    signer: Arc<dyn Signer>,
}

impl ArtifactStore {
    /// Creates a store rooted at `root` with the given signer.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, signer: Arc<dyn Signer>) -> Self {
        Self {
            root: root.into(),
            signer,
        }
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores bytes and metadata under the given id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] for signer failures,
    /// [`CoreError::Internal`] for filesystem failures.
    pub async fn put(
        &self,
        id: ArtifactId,
        bytes: &[u8],
        upload: ArtifactUpload,
    ) -> Result<Artifact, CoreError> {
        let signature = self.signer.sign(bytes)?;
        let now = now_unix_millis();
        let artifact = Artifact {
            id: id.clone(),
            name: upload.name,
            version: upload.version,
            description: upload.description,
            artifact_type: upload.artifact_type,
            architecture: upload.architecture,
            kernel_version: upload.kernel_version,
            tags: upload.tags,
            hosts: upload.hosts,
            signature: Some(signature),
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            checksum: hash_bytes(DEFAULT_HASH_ALGORITHM, bytes).value,
            metadata: upload.metadata,
            created_at: now,
            updated_at: now,
        };
        let metadata = artifact
            .to_metadata()
            .map_err(|err| CoreError::Internal(format!("metadata timestamps: {err}")))?;
        let metadata_json = serde_json::to_vec_pretty(&metadata)
            .map_err(|err| CoreError::Internal(format!("metadata serialization: {err}")))?;

        let dir = self.root.join(id.as_str());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| CoreError::Internal(format!("artifact dir: {err}")))?;
        tokio::fs::write(dir.join(ARTIFACT_FILE), bytes)
            .await
            .map_err(|err| CoreError::Internal(format!("artifact write: {err}")))?;
        tokio::fs::write(dir.join(METADATA_FILE), metadata_json)
            .await
            .map_err(|err| CoreError::Internal(format!("metadata write: {err}")))?;
        Ok(artifact)
    }

    /// Returns the bytes and record for an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown ids.
    pub async fn get(&self, id: &ArtifactId) -> Result<(Vec<u8>, Artifact), CoreError> {
        let artifact = self.get_metadata(id).await?;
        let bytes = tokio::fs::read(self.root.join(id.as_str()).join(ARTIFACT_FILE))
            .await
            .map_err(|_| CoreError::NotFound(format!("artifact {id}")))?;
        Ok((bytes, artifact))
    }

    /// Returns the record for an artifact without its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown ids and
    /// [`CoreError::Internal`] for undecodable metadata.
    pub async fn get_metadata(&self, id: &ArtifactId) -> Result<Artifact, CoreError> {
        let raw = tokio::fs::read(self.root.join(id.as_str()).join(METADATA_FILE))
            .await
            .map_err(|_| CoreError::NotFound(format!("artifact {id}")))?;
        let metadata: ArtifactMetadata = serde_json::from_slice(&raw)
            .map_err(|err| CoreError::Internal(format!("metadata decode: {err}")))?;
        metadata
            .into_artifact()
            .map_err(|err| CoreError::Internal(format!("metadata timestamps: {err}")))
    }

    /// Enumerates stored artifacts by directory.
    ///
    /// Undecodable entries are skipped with a warning so one corrupt
    /// directory cannot hide the rest.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] when the root cannot be read.
    pub async fn list(&self) -> Result<Vec<Artifact>, CoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(CoreError::Internal(format!("artifact root: {err}"))),
        };
        let mut artifacts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| CoreError::Internal(format!("artifact root: {err}")))?
        {
            let id = ArtifactId::new(entry.file_name().to_string_lossy().into_owned());
            match self.get_metadata(&id).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(err) => {
                    tracing::warn!(artifact = %id, error = %err, "skipping undecodable artifact");
                }
            }
        }
        artifacts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(artifacts)
    }

    /// Lists artifacts scoped to a host.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] when the root cannot be read.
    pub async fn for_host(&self, host_id: &str) -> Result<Vec<Artifact>, CoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|artifact| {
                artifact
                    .hosts
                    .as_ref()
                    .is_some_and(|hosts| hosts.iter().any(|host| host == host_id))
            })
            .collect())
    }
}
