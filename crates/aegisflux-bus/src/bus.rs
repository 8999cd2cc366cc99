// crates/aegisflux-bus/src/bus.rs
// ============================================================================
// Module: Bus Trait
// Description: Backend-agnostic publish/subscribe contract.
// Purpose: Define the message, error, and subscription surface for the bus.
// Dependencies: async-trait, bytes, tokio
// ============================================================================

//! ## Overview
//! The [`Bus`] trait is the single seam between pipeline logic and the wire.
//! Implementations must deliver at-least-once, preserve a single
//! publisher's order toward a single subscriber, and carry flat string
//! header maps alongside opaque payload bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Default deadline callers apply around a publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Flat string header map carried with each message.
pub type Headers = BTreeMap<String, String>;

/// A message delivered from the bus.
///
/// # Invariants
/// - `payload` is an immutable copy; subscribers never mutate shared state
///   through it.
/// - `reply` is set only for request-style messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Subject the message was published on.
    pub subject: String,
    /// Header map attached by the publisher.
    pub headers: Headers,
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Reply subject for request/reply exchanges.
    pub reply: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by bus implementations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BusError {
    /// Connection establishment failed.
    #[error("bus connect failure: {0}")]
    Connect(String),
    /// Publish was rejected or the connection dropped mid-flight.
    #[error("bus publish failure: {0}")]
    Publish(String),
    /// Subscription setup failed.
    #[error("bus subscribe failure: {0}")]
    Subscribe(String),
    /// Request dispatch failed before a reply arrived.
    #[error("bus request failure: {0}")]
    Request(String),
    /// No reply arrived within the caller's deadline.
    #[error("bus request timed out after {0:?}")]
    Timeout(Duration),
    /// Reply was attempted on a message without a reply subject.
    #[error("message on subject {0} carries no reply subject")]
    MissingReply(String),
}

// ============================================================================
// SECTION: Subscription Handle
// ============================================================================

/// Default buffered capacity for subscription channels.
pub(crate) const SUBSCRIPTION_CAPACITY: usize = 1024;

/// A handle draining messages for one subscription.
///
/// # Invariants
/// - Dropping the handle tears the subscription down.
#[derive(Debug)]
pub struct BusSubscription {
    /// Channel the implementation pumps matched messages into.
    receiver: mpsc::Receiver<BusMessage>,
}

impl BusSubscription {
    /// Wraps a receiver pumped by a bus implementation.
    #[must_use]
    pub(crate) const fn new(receiver: mpsc::Receiver<BusMessage>) -> Self {
        Self {
            receiver,
        }
    }

    /// Awaits the next message; `None` when the subscription closed.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }

    /// Returns an already-buffered message without waiting.
    pub fn try_next(&mut self) -> Option<BusMessage> {
        self.receiver.try_recv().ok()
    }
}

// ============================================================================
// SECTION: Bus Trait
// ============================================================================

/// Backend-agnostic message bus.
///
/// # Invariants
/// - Implementations deliver at-least-once.
/// - A single subscriber observes one publisher's order for messages that
///   are actually delivered.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publishes payload bytes on a subject.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Publish`] when delivery cannot be handed to the
    /// transport.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError>;

    /// Publishes payload bytes with a header map.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Publish`] when delivery cannot be handed to the
    /// transport.
    async fn publish_with_headers(
        &self,
        subject: &str,
        headers: Headers,
        payload: Bytes,
    ) -> Result<(), BusError>;

    /// Subscribes to a subject pattern (`*` and `>` wildcards supported).
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Subscribe`] when the subscription cannot be set
    /// up.
    async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError>;

    /// Subscribes within a queue group; group members share delivery.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Subscribe`] when the subscription cannot be set
    /// up.
    async fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<BusSubscription, BusError>;

    /// Publishes a request and awaits the first reply within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Timeout`] when no reply arrives in time and
    /// [`BusError::Request`] for transport failures.
    async fn request(
        &self,
        subject: &str,
        headers: Headers,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<BusMessage, BusError>;

    /// Replies to a request-style message.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::MissingReply`] when the message has no reply
    /// subject and [`BusError::Publish`] for transport failures.
    async fn respond(&self, message: &BusMessage, payload: Bytes) -> Result<(), BusError>;

    /// Returns true while the transport connection is healthy.
    fn connected(&self) -> bool;
}
