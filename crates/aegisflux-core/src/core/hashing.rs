// crates/aegisflux-core/src/core/hashing.rs
// ============================================================================
// Module: AegisFlux Hashing
// Description: Content hashing with hex wire forms.
// Purpose: Provide digests for dedup keys, checksums, and content addressing.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! All AegisFlux digests are lowercase hex strings on the wire. SHA-256 is
//! the only algorithm currently in the closed set; the enum exists so
//! stored checksums remain self-describing if the set ever grows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Algorithms
// ============================================================================

/// Hash algorithm for a digest value.
///
/// # Invariants
/// - Variants are stable for serialization and checksum verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 with a 64-character lowercase hex wire form.
    Sha256,
}

/// Default hash algorithm for new digests.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Digests
// ============================================================================

/// A computed digest with its algorithm.
///
/// # Invariants
/// - `value` is lowercase hex of the algorithm's output length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest value.
    pub value: String,
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// ============================================================================
// SECTION: Hash Functions
// ============================================================================

/// Hashes a byte slice with the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            HashDigest {
                algorithm,
                value: hex_encode(&hasher.finalize()),
            }
        }
    }
}

/// Hashes multiple parts joined with a `|` separator byte.
///
/// The separator keeps part boundaries unambiguous so `("ab", "c")` and
/// `("a", "bc")` never collide.
#[must_use]
pub fn hash_parts(algorithm: HashAlgorithm, parts: &[&[u8]]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            for (index, part) in parts.iter().enumerate() {
                if index > 0 {
                    hasher.update(b"|");
                }
                hasher.update(part);
            }
            HashDigest {
                algorithm,
                value: hex_encode(&hasher.finalize()),
            }
        }
    }
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = fmt::Write::write_fmt(&mut out, format_args!("{byte:02x}"));
    }
    out
}
