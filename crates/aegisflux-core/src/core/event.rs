// crates/aegisflux-core/src/core/event.rs
// ============================================================================
// Module: AegisFlux Events
// Description: Raw events admitted at ingest and enriched events consumed
//              by the correlator.
// Purpose: Provide wire-stable event records with boundary validation.
// Dependencies: base64, serde, serde_json
// ============================================================================

//! ## Overview
//! [`Event`] is the record agents stream into ingest; its required fields and
//! closed type set are enforced by schema validation before anything reaches
//! the bus. [`EnrichedEvent`] is the shape the external enrich stage
//! publishes on `events.enriched`; the correlator is deliberately forgiving
//! about it (both `event_type` and `type` are accepted, the timestamp may be
//! absent), so every field beyond `host_id` is optional or defaulted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::EventId;
use crate::core::identifiers::HostId;
use crate::error::CoreError;

// ============================================================================
// SECTION: Event Type
// ============================================================================

/// Closed set of raw event types accepted at ingest.
///
/// # Invariants
/// - Variants are stable for serialization and schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Security-relevant host activity.
    Security,
    /// Audit-trail records.
    Audit,
    /// Performance measurements.
    Performance,
    /// Application-level events.
    Application,
    /// Operating system events.
    System,
}

impl EventType {
    /// Returns the stable wire label for the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Audit => "audit",
            Self::Performance => "performance",
            Self::Application => "application",
            Self::System => "system",
        }
    }
}

// ============================================================================
// SECTION: Raw Event
// ============================================================================

/// A raw event streamed into ingest and published on `events.raw`.
///
/// # Invariants
/// - `id`, `event_type`, `source`, and `timestamp` are required.
/// - `timestamp` is unix milliseconds and strictly positive.
/// - Events are immutable once published; the bus carries copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier assigned by the producer.
    pub id: EventId,
    /// Event type from the closed set.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Producer identifier (agent or collector name).
    pub source: String,
    /// Event time as unix milliseconds; strictly positive.
    pub timestamp: i64,
    /// Optional string metadata supplied by the producer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Optional opaque payload carried as base64 on the wire.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
}

impl Event {
    /// Validates the boundary invariants that the JSON schema also enforces.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when a required field is empty or
    /// the timestamp is not strictly positive.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.as_str().is_empty() {
            return Err(CoreError::InvalidInput("event id must not be empty".to_string()));
        }
        if self.source.is_empty() {
            return Err(CoreError::InvalidInput("event source must not be empty".to_string()));
        }
        if self.timestamp <= 0 {
            return Err(CoreError::InvalidInput(format!(
                "event timestamp must be positive, got {}",
                self.timestamp
            )));
        }
        Ok(())
    }

    /// Returns the host identifier from metadata when the producer set one.
    #[must_use]
    pub fn host_id(&self) -> Option<&str> {
        self.metadata.get("host_id").map(String::as_str)
    }
}

// ============================================================================
// SECTION: Enriched Event
// ============================================================================

/// An enriched event published by the external enrich stage.
///
/// # Invariants
/// - `host_id` is the only field the correlator insists on.
/// - `event_type` accepts both `event_type` and `type` wire keys.
/// - `timestamp` may be absent; consumers substitute their receive time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    /// Host the event was observed on.
    pub host_id: HostId,
    /// Free-form event type string, e.g. `exec`, `connect`, `file`.
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Path of the binary involved, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<String>,
    /// Structured arguments extracted by the enricher.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, Value>,
    /// Enrichment context (environment, service, region, labels, CVEs).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
    /// Event time as unix milliseconds, when the enricher preserved it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl EnrichedEvent {
    /// Returns the event time, substituting `received_at` when absent.
    #[must_use]
    pub fn timestamp_or(&self, received_at: i64) -> i64 {
        self.timestamp.unwrap_or(received_at)
    }

    /// Renders the event as a JSON value for predicate evaluation and
    /// evidence capture.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Returns a string from `context` when present and string-valued.
    #[must_use]
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Payload Encoding
// ============================================================================

/// Serde adapter carrying optional payload bytes as base64 strings.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    /// Serializes optional bytes as a base64 string.
    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes optional bytes from a base64 string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(|err| serde::de::Error::custom(format!("invalid base64 payload: {err}"))),
            None => Ok(None),
        }
    }
}
