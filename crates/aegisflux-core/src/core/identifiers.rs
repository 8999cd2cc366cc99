// crates/aegisflux-core/src/core/identifiers.rs
// ============================================================================
// Module: AegisFlux Identifiers
// Description: Canonical opaque identifiers for pipeline records.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout AegisFlux.
//! Identifiers are opaque strings on the wire. No normalization or validation
//! is applied by the types themselves; boundaries that mint identifiers use
//! [`random`](EventId::random)-style constructors backed by UUIDv4.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares an opaque string identifier with a stable wire form.
macro_rules! string_identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the provided value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mints a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the owned string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier! {
    /// Event identifier assigned by the producing agent.
    EventId
}

string_identifier! {
    /// Host identifier for the machine an event or finding refers to.
    HostId
}

string_identifier! {
    /// Rule identifier declared in a correlation rule file.
    RuleId
}

string_identifier! {
    /// Finding identifier derived from host, rule, and dedup bucket.
    FindingId
}

string_identifier! {
    /// Plan identifier minted by the decision pipeline.
    PlanId
}

string_identifier! {
    /// Correlation identifier threading a finding through to its plan.
    CorrelationId
}

string_identifier! {
    /// Override identifier minted when a runtime rule override is added.
    OverrideId
}

string_identifier! {
    /// Agent identifier minted when a registration completes.
    AgentUid
}

string_identifier! {
    /// Registration identifier for a pending challenge/response flow.
    RegistrationId
}

string_identifier! {
    /// Artifact identifier for a stored, signed bundle.
    ArtifactId
}
