// crates/aegisflux-core/src/error.rs
// ============================================================================
// Module: AegisFlux Errors
// Description: Stable error kinds surfaced by the pipeline core.
// Purpose: Provide one error vocabulary with HTTP mappings and wire bodies.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every service maps failures into the same closed set of kinds:
//! `InvalidInput`, `NotFound`, `Unauthorized`, `Unavailable`, `Conflict`,
//! and `Internal`. Validators and parsers return `InvalidInput`
//! synchronously; transient bus errors are retried at the publisher and only
//! surface as `Unavailable` after exhaustion. Clients always receive a JSON
//! body of `{error, timestamp}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::now_rfc3339;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Stable error classification used across service boundaries.
///
/// # Invariants
/// - Variants are stable for programmatic handling and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed JSON, failed schema validation, missing required fields.
    InvalidInput,
    /// Unknown identifier (plan, agent, artifact, override).
    NotFound,
    /// Signature verification failure at registration.
    Unauthorized,
    /// Bus not connected, publish timeout, dependency down.
    Unavailable,
    /// Reserved for exclusivity conflicts in the agent registry.
    Conflict,
    /// Unexpected invariant violation.
    Internal,
}

// ============================================================================
// SECTION: Core Error
// ============================================================================

/// Canonical error surfaced by the pipeline core.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed JSON, failed schema validation, missing required fields.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Unknown identifier.
    #[error("not found: {0}")]
    NotFound(String),
    /// Signature verification failure.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Dependency down or publish timed out.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Exclusivity conflict.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Unexpected invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns the stable classification for the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code the error maps to.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Unauthorized(_) => 401,
            Self::Unavailable(_) => 503,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }
}

// ============================================================================
// SECTION: Wire Body
// ============================================================================

/// JSON error body returned to HTTP clients.
///
/// # Invariants
/// - `timestamp` is the RFC 3339 time the body was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// RFC 3339 time the error was surfaced.
    pub timestamp: String,
}

impl ErrorBody {
    /// Builds a wire body from any displayable error.
    #[must_use]
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
            timestamp: now_rfc3339(),
        }
    }
}

impl From<&CoreError> for ErrorBody {
    fn from(err: &CoreError) -> Self {
        Self::new(err)
    }
}
