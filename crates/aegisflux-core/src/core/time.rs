// crates/aegisflux-core/src/core/time.rs
// ============================================================================
// Module: AegisFlux Time Helpers
// Description: Unix-millisecond timestamps and RFC 3339 formatting.
// Purpose: Keep wall-clock reads and wire formatting in one place.
// Dependencies: time
// ============================================================================

//! ## Overview
//! AegisFlux carries unix-millisecond timestamps on the wire and RFC 3339
//! strings in artifact metadata and registration challenges. Pure stages
//! (guardrails, the evaluator's predicate layer) never read the wall clock
//! directly; callers pass explicit timestamps so those paths stay
//! deterministic and testable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing wire timestamps.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TimeParseError {
    /// Input was not a valid RFC 3339 timestamp.
    #[error("invalid rfc3339 timestamp: {0}")]
    InvalidRfc3339(String),
    /// Input was outside the representable unix-millisecond range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(i64),
}

// ============================================================================
// SECTION: Clock Reads
// ============================================================================

/// Returns the current wall-clock time as unix milliseconds.
#[must_use]
pub fn now_unix_millis() -> i64 {
    let now = OffsetDateTime::now_utc();
    let nanos = now.unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

/// Returns the current wall-clock time as an RFC 3339 string.
///
/// Formatting the current instant cannot fail for representable dates; the
/// epoch string is returned as a last resort so callers never observe an
/// error from a clock read.
#[must_use]
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Formats a unix-millisecond timestamp as RFC 3339.
///
/// # Errors
///
/// Returns [`TimeParseError::OutOfRange`] when the value does not map onto a
/// representable date.
pub fn format_rfc3339(unix_millis: i64) -> Result<String, TimeParseError> {
    let nanos = i128::from(unix_millis) * 1_000_000;
    let instant = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|_| TimeParseError::OutOfRange(unix_millis))?;
    instant.format(&Rfc3339).map_err(|_| TimeParseError::OutOfRange(unix_millis))
}

/// Parses an RFC 3339 string into unix milliseconds.
///
/// # Errors
///
/// Returns [`TimeParseError::InvalidRfc3339`] when the input does not parse.
pub fn parse_rfc3339(value: &str) -> Result<i64, TimeParseError> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|_| TimeParseError::InvalidRfc3339(value.to_string()))?;
    let millis = parsed.unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).map_err(|_| TimeParseError::InvalidRfc3339(value.to_string()))
}
