// crates/aegisflux-registry/tests/registration_unit.rs
// ============================================================================
// Module: Registration Unit Tests
// Description: Two-step Ed25519 challenge flow tests.
// Purpose: Validate single-use challenges and signature verification.
// Dependencies: aegisflux-registry, base64, ed25519-dalek
// ============================================================================

//! ## Overview
//! Exercises [`aegisflux_registry::AgentRegistry`]: the happy path with a
//! real Ed25519 key pair, single-use registration ids, and the 400/401/404
//! error mapping for malformed input, bad signatures, and unknown ids.

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
use std::collections::BTreeSet;

use aegisflux_core::CoreError;
use aegisflux_registry::AgentRegistry;
use aegisflux_registry::CompleteRequest;
use aegisflux_registry::InitRequest;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::Signer as _;
use ed25519_dalek::SigningKey;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn init_request(key: &SigningKey, host: &str) -> InitRequest {
    InitRequest {
        host_id: host.into(),
        org_id: "org-1".to_string(),
        public_key: STANDARD.encode(key.verifying_key().to_bytes()),
        capabilities: vec!["exec-trace".to_string()],
        platform: BTreeMap::from([("os".to_string(), "linux".to_string())]),
        network: BTreeMap::new(),
    }
}

fn sign_challenge(key: &SigningKey, nonce_b64: &str, server_time: &str, host: &str) -> String {
    let mut message = STANDARD.decode(nonce_b64.as_bytes()).expect("nonce decodes");
    message.extend_from_slice(server_time.as_bytes());
    message.extend_from_slice(host.as_bytes());
    STANDARD.encode(key.sign(&message).to_bytes())
}

// ============================================================================
// SECTION: Happy Path
// ============================================================================

#[test]
fn registration_completes_with_a_valid_signature() {
    let registry = AgentRegistry::new();
    let key = signing_key();

    let init = registry.init(init_request(&key, "web-01")).expect("init");
    assert_eq!(STANDARD.decode(init.nonce.as_bytes()).expect("nonce").len(), 32);
    assert!(!init.server_time.is_empty());
    assert_eq!(registry.pending_len(), 1);

    let signature = sign_challenge(&key, &init.nonce, &init.server_time, "web-01");
    let complete = registry
        .complete(CompleteRequest {
            registration_id: init.registration_id.clone(),
            host_id: "web-01".into(),
            signature,
        })
        .expect("complete");
    assert!(!complete.bootstrap_token.is_empty());
    assert_eq!(registry.pending_len(), 0);

    let agent = registry.get(&complete.agent_uid).expect("registered agent");
    assert_eq!(agent.host_id.as_str(), "web-01");
    assert_eq!(agent.org_id, "org-1");
    assert_eq!(agent.public_key, STANDARD.encode(key.verifying_key().to_bytes()));
}

#[test]
fn a_completed_registration_cannot_complete_again() {
    let registry = AgentRegistry::new();
    let key = signing_key();
    let init = registry.init(init_request(&key, "web-01")).expect("init");
    let signature = sign_challenge(&key, &init.nonce, &init.server_time, "web-01");
    let request = CompleteRequest {
        registration_id: init.registration_id,
        host_id: "web-01".into(),
        signature,
    };

    registry.complete(request.clone()).expect("first completion");
    let second = registry.complete(request);
    assert!(matches!(second, Err(CoreError::NotFound(_))));
}

// ============================================================================
// SECTION: Failure Mapping
// ============================================================================

#[test]
fn wrong_key_signature_is_unauthorized_and_keeps_the_pending_record() {
    let registry = AgentRegistry::new();
    let key = signing_key();
    let wrong_key = SigningKey::from_bytes(&[9u8; 32]);

    let init = registry.init(init_request(&key, "web-01")).expect("init");
    let signature = sign_challenge(&wrong_key, &init.nonce, &init.server_time, "web-01");
    let result = registry.complete(CompleteRequest {
        registration_id: init.registration_id,
        host_id: "web-01".into(),
        signature,
    });
    assert!(matches!(result, Err(CoreError::Unauthorized(_))));
    assert_eq!(registry.pending_len(), 1);
}

#[test]
fn unknown_registration_is_not_found() {
    let registry = AgentRegistry::new();
    let result = registry.complete(CompleteRequest {
        registration_id: "ghost".into(),
        host_id: "web-01".into(),
        signature: STANDARD.encode([0u8; 64]),
    });
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[test]
fn init_rejects_keys_that_are_not_32_bytes() {
    let registry = AgentRegistry::new();
    let key = signing_key();
    let mut request = init_request(&key, "web-01");
    request.public_key = STANDARD.encode([1u8; 31]);
    assert!(matches!(registry.init(request), Err(CoreError::InvalidInput(_))));

    let mut request = init_request(&key, "web-01");
    request.public_key = "not base64 !!!".to_string();
    assert!(matches!(registry.init(request), Err(CoreError::InvalidInput(_))));
}

#[test]
fn complete_rejects_malformed_signatures_and_host_mismatch() {
    let registry = AgentRegistry::new();
    let key = signing_key();
    let init = registry.init(init_request(&key, "web-01")).expect("init");

    let short = registry.complete(CompleteRequest {
        registration_id: init.registration_id.clone(),
        host_id: "web-01".into(),
        signature: STANDARD.encode([0u8; 16]),
    });
    assert!(matches!(short, Err(CoreError::InvalidInput(_))));

    let signature = sign_challenge(&key, &init.nonce, &init.server_time, "web-01");
    let mismatch = registry.complete(CompleteRequest {
        registration_id: init.registration_id,
        host_id: "db-01".into(),
        signature,
    });
    assert!(matches!(mismatch, Err(CoreError::InvalidInput(_))));
}

#[test]
fn a_tampered_challenge_does_not_verify() {
    let registry = AgentRegistry::new();
    let key = signing_key();
    let init = registry.init(init_request(&key, "web-01")).expect("init");

    // Signature over a different server time must fail.
    let signature = sign_challenge(&key, &init.nonce, "2030-01-01T00:00:00Z", "web-01");
    let result = registry.complete(CompleteRequest {
        registration_id: init.registration_id,
        host_id: "web-01".into(),
        signature,
    });
    assert!(matches!(result, Err(CoreError::Unauthorized(_))));
}

// ============================================================================
// SECTION: Agent CRUD
// ============================================================================

#[test]
fn labels_and_note_updates_round_trip() {
    let registry = AgentRegistry::new();
    let key = signing_key();
    let init = registry.init(init_request(&key, "web-01")).expect("init");
    let signature = sign_challenge(&key, &init.nonce, &init.server_time, "web-01");
    let complete = registry
        .complete(CompleteRequest {
            registration_id: init.registration_id,
            host_id: "web-01".into(),
            signature,
        })
        .expect("complete");

    let labels = BTreeSet::from(["edge".to_string(), "production".to_string()]);
    let updated = registry.set_labels(&complete.agent_uid, labels.clone()).expect("labels");
    assert_eq!(updated.labels, labels);

    let noted =
        registry.set_note(&complete.agent_uid, Some("canary cohort".to_string())).expect("note");
    assert_eq!(noted.note.as_deref(), Some("canary cohort"));

    assert_eq!(registry.list(Some("edge")).len(), 1);
    assert!(registry.list(Some("missing")).is_empty());
    assert_eq!(registry.list(None).len(), 1);

    let ghost = registry.set_labels(&"ghost".into(), BTreeSet::new());
    assert!(matches!(ghost, Err(CoreError::NotFound(_))));
}
