// crates/aegisflux-core/tests/hashing_unit.rs
// ============================================================================
// Module: Hashing Unit Tests
// Description: Digest stability and separator-boundary tests.
// Purpose: Validate hex forms and part-boundary collision resistance.
// Dependencies: aegisflux-core, proptest
// ============================================================================

//! ## Overview
//! Ensures digests are stable lowercase hex and that `hash_parts` keeps part
//! boundaries unambiguous across arbitrary inputs.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use aegisflux_core::DEFAULT_HASH_ALGORITHM;
use aegisflux_core::core::hashing::hash_bytes;
use aegisflux_core::core::hashing::hash_parts;
use proptest::prelude::*;

#[test]
fn sha256_digest_is_64_lowercase_hex_chars() {
    let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, b"aegisflux");
    assert_eq!(digest.value.len(), 64);
    assert!(digest.value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn hash_bytes_matches_known_vector() {
    let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, b"");
    assert_eq!(
        digest.value,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn hash_parts_distinguishes_boundary_shifts() {
    let a = hash_parts(DEFAULT_HASH_ALGORITHM, &[b"ab", b"c"]);
    let b = hash_parts(DEFAULT_HASH_ALGORITHM, &[b"a", b"bc"]);
    assert_ne!(a, b);
}

#[test]
fn hash_parts_single_part_equals_hash_bytes() {
    let joined = hash_parts(DEFAULT_HASH_ALGORITHM, &[b"rule-1"]);
    let plain = hash_bytes(DEFAULT_HASH_ALGORITHM, b"rule-1");
    assert_eq!(joined, plain);
}

proptest! {
    #[test]
    fn hash_parts_is_deterministic(parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0 .. 32), 0 .. 6)) {
        let views: Vec<&[u8]> = parts.iter().map(Vec::as_slice).collect();
        let first = hash_parts(DEFAULT_HASH_ALGORITHM, &views);
        let second = hash_parts(DEFAULT_HASH_ALGORITHM, &views);
        prop_assert_eq!(first, second);
    }
}
