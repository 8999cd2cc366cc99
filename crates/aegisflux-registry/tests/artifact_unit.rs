// crates/aegisflux-registry/tests/artifact_unit.rs
// ============================================================================
// Module: Artifact Store Unit Tests
// Description: Filesystem layout, signing, and metadata round-trips.
// Purpose: Validate the content-addressed store contract.
// Dependencies: aegisflux-registry, serde_json, tempfile, tokio
// ============================================================================

//! ## Overview
//! Exercises [`aegisflux_registry::ArtifactStore`]: the on-disk layout
//! (`<root>/<id>/artifact.tar.zst` + `metadata.json`), mandatory
//! deterministic signing, checksum integrity, metadata round-trips, and
//! host scoping. Bundle storage byte fidelity is covered alongside.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use aegisflux_core::ArtifactMetadata;
use aegisflux_core::CoreError;
use aegisflux_registry::ArtifactStore;
use aegisflux_registry::ArtifactUpload;
use aegisflux_registry::AssignmentStore;
use aegisflux_registry::DevSigner;
use aegisflux_registry::Signer;
use tempfile::tempdir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn sample_upload(hosts: Option<Vec<String>>) -> ArtifactUpload {
    ArtifactUpload {
        name: "exec-tracer".to_string(),
        version: "1.4.0".to_string(),
        description: "Process execution tracer".to_string(),
        artifact_type: "ebpf_bundle".to_string(),
        architecture: "x86_64".to_string(),
        kernel_version: ">=5.15".to_string(),
        tags: vec!["tracer".to_string()],
        hosts,
        metadata: BTreeMap::from([("team".to_string(), "detect".to_string())]),
    }
}

// ============================================================================
// SECTION: Store Layout and Round-Trips
// ============================================================================

#[tokio::test]
async fn put_writes_the_content_addressed_layout() {
    let root = tempdir().expect("tempdir");
    let store = ArtifactStore::new(root.path(), Arc::new(DevSigner));
    let bytes = b"tarball bytes".to_vec();

    let artifact = store
        .put("art-1".into(), &bytes, sample_upload(None))
        .await
        .expect("put");

    let dir = root.path().join("art-1");
    assert!(dir.join("artifact.tar.zst").is_file());
    assert!(dir.join("metadata.json").is_file());
    assert_eq!(artifact.size, bytes.len() as u64);
    assert_eq!(artifact.checksum.len(), 64);
    assert!(artifact.signature.as_deref().is_some_and(|sig| sig.starts_with("dev:")));

    // metadata.json is the ArtifactMetadata mirror with RFC 3339 times.
    let raw = std::fs::read(dir.join("metadata.json")).expect("read metadata");
    let metadata: ArtifactMetadata = serde_json::from_slice(&raw).expect("decode metadata");
    assert!(metadata.created_at.contains('T'));
    let round_tripped = metadata.into_artifact().expect("into artifact");
    assert_eq!(round_tripped, artifact);
}

#[tokio::test]
async fn get_returns_byte_identical_content() {
    let root = tempdir().expect("tempdir");
    let store = ArtifactStore::new(root.path(), Arc::new(DevSigner));
    let bytes: Vec<u8> = (0 ..= 255).collect();

    let stored = store.put("art-1".into(), &bytes, sample_upload(None)).await.expect("put");
    let (fetched_bytes, fetched) = store.get(&"art-1".into()).await.expect("get");
    assert_eq!(fetched_bytes, bytes);
    assert_eq!(fetched, stored);
}

#[tokio::test]
async fn unknown_artifacts_are_not_found() {
    let root = tempdir().expect("tempdir");
    let store = ArtifactStore::new(root.path(), Arc::new(DevSigner));
    assert!(matches!(store.get(&"ghost".into()).await, Err(CoreError::NotFound(_))));
    assert!(matches!(store.get_metadata(&"ghost".into()).await, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn list_enumerates_by_directory_and_for_host_filters() {
    let root = tempdir().expect("tempdir");
    let store = ArtifactStore::new(root.path(), Arc::new(DevSigner));
    store
        .put("art-1".into(), b"one", sample_upload(Some(vec!["web-01".to_string()])))
        .await
        .expect("put");
    store.put("art-2".into(), b"two", sample_upload(None)).await.expect("put");

    let all = store.list().await.expect("list");
    assert_eq!(all.len(), 2);
    let ids: Vec<&str> = all.iter().map(|artifact| artifact.id.as_str()).collect();
    assert_eq!(ids, vec!["art-1", "art-2"]);

    let scoped = store.for_host("web-01").await.expect("for_host");
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].id.as_str(), "art-1");
    assert!(store.for_host("db-01").await.expect("for_host").is_empty());
}

#[tokio::test]
async fn listing_an_absent_root_yields_no_artifacts() {
    let root = tempdir().expect("tempdir");
    let store = ArtifactStore::new(root.path().join("missing"), Arc::new(DevSigner));
    assert!(store.list().await.expect("list").is_empty());
}

// ============================================================================
// SECTION: Signing
// ============================================================================

#[test]
fn dev_signer_is_deterministic_and_input_sensitive() {
    let signer = DevSigner;
    let first = signer.sign(b"payload").expect("sign");
    let second = signer.sign(b"payload").expect("sign");
    let other = signer.sign(b"different").expect("sign");
    assert_eq!(first, second);
    assert_ne!(first, other);
    assert!(first.starts_with("dev:"));
}

// ============================================================================
// SECTION: Bundles and Assignments
// ============================================================================

#[test]
fn bundle_bytes_round_trip_unchanged() {
    let store = AssignmentStore::new();
    let bytes: Vec<u8> = (0 ..= 255).rev().collect();
    store.put_bundle("art-1".into(), bytes.clone());
    assert_eq!(store.get_bundle(&"art-1".into()), Some(bytes));
    assert_eq!(store.get_bundle(&"ghost".into()), None);
}

#[test]
fn assignments_keep_order_and_refresh_on_reassign() {
    let store = AssignmentStore::new();
    store.assign("web-01".into(), "art-1".into(), Some("ops".to_string()));
    store.assign("web-01".into(), "art-2".into(), None);
    store.assign("db-01".into(), "art-1".into(), None);

    let assignments = store.for_host(&"web-01".into());
    assert_eq!(assignments.len(), 2);
    assert_eq!(assignments[0].artifact_id.as_str(), "art-1");
    assert_eq!(assignments[1].artifact_id.as_str(), "art-2");

    // Re-assigning moves the artifact to the back with a fresh timestamp.
    store.assign("web-01".into(), "art-1".into(), None);
    let refreshed = store.for_host(&"web-01".into());
    assert_eq!(refreshed.len(), 2);
    assert_eq!(refreshed[1].artifact_id.as_str(), "art-1");

    assert!(store.for_host(&"ghost".into()).is_empty());
}
