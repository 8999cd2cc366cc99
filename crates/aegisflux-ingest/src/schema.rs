// crates/aegisflux-ingest/src/schema.rs
// ============================================================================
// Module: Event Schema Validator
// Description: Compile-once JSON schema gate for raw events.
// Purpose: Reject malformed events before anything reaches the bus.
// Dependencies: aegisflux-core, jsonschema, serde_json
// ============================================================================

//! ## Overview
//! The event schema is embedded and compiled exactly once at service start.
//! It enforces the closed type set, required fields, a strictly positive
//! unix-millisecond timestamp, string-valued metadata, and a base64 string
//! payload. Readiness reporting hinges on this compilation having
//! succeeded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aegisflux_core::CoreError;
use serde_json::Value;

// ============================================================================
// SECTION: Schema Source
// ============================================================================

/// Embedded JSON schema for raw events.
pub const EVENT_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "Event",
  "type": "object",
  "required": ["id", "type", "source", "timestamp"],
  "properties": {
    "id": {"type": "string", "minLength": 1},
    "type": {"enum": ["security", "audit", "performance", "application", "system"]},
    "source": {"type": "string", "minLength": 1},
    "timestamp": {"type": "integer", "minimum": 1},
    "metadata": {"type": "object", "additionalProperties": {"type": "string"}},
    "payload": {"type": "string"}
  },
  "additionalProperties": false
}"#;

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Compile-once schema validator.
pub struct SchemaValidator {
    /// Compiled schema.
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compiles the embedded event schema.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] when the embedded schema itself is
    /// malformed; this is a build defect, not an input error.
    pub fn compile() -> Result<Self, CoreError> {
        let schema: Value = serde_json::from_str(EVENT_SCHEMA)
            .map_err(|err| CoreError::Internal(format!("embedded schema unparsable: {err}")))?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|err| CoreError::Internal(format!("embedded schema invalid: {err}")))?;
        Ok(Self {
            validator,
        })
    }

    /// Validates one event instance.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] describing the first violation.
    pub fn validate(&self, instance: &Value) -> Result<(), CoreError> {
        self.validator
            .validate(instance)
            .map_err(|err| CoreError::InvalidInput(format!("event failed schema validation: {err}")))
    }

    /// Returns true when the instance passes the schema.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}
