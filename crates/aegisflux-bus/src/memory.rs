// crates/aegisflux-bus/src/memory.rs
// ============================================================================
// Module: In-Memory Bus
// Description: Process-local bus with wildcard subjects and queue groups.
// Purpose: Back every test and single-process deployment without a server.
// Dependencies: bytes, parking_lot, tokio, uuid
// ============================================================================

//! ## Overview
//! [`MemoryBus`] implements [`Bus`] entirely in process. Plain subscribers
//! each receive a copy of every matching message; queue-group subscribers
//! share delivery round-robin. Slow subscribers drop messages once their
//! channel is full, which matches the at-least-once (not exactly-once)
//! delivery contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bus::Bus;
use crate::bus::BusError;
use crate::bus::BusMessage;
use crate::bus::BusSubscription;
use crate::bus::Headers;
use crate::bus::SUBSCRIPTION_CAPACITY;
use crate::subject::subject_matches;

// ============================================================================
// SECTION: Subscription Registry
// ============================================================================

/// One registered subscription endpoint.
struct Endpoint {
    /// Subject pattern the endpoint listens on.
    pattern: String,
    /// Queue group name; `None` for broadcast subscribers.
    queue_group: Option<String>,
    /// Channels for the endpoint's members (one per group member).
    senders: Vec<mpsc::Sender<BusMessage>>,
    /// Round-robin cursor for queue-group delivery.
    cursor: AtomicUsize,
}

impl Endpoint {
    /// Delivers a message to the endpoint, honoring group semantics.
    fn deliver(&self, message: &BusMessage) {
        if self.queue_group.is_some() {
            let len = self.senders.len();
            if len == 0 {
                return;
            }
            let start = self.cursor.fetch_add(1, Ordering::Relaxed);
            for offset in 0 .. len {
                let sender = &self.senders[(start + offset) % len];
                if sender.try_send(message.clone()).is_ok() {
                    return;
                }
            }
        } else {
            for sender in &self.senders {
                let _ = sender.try_send(message.clone());
            }
        }
    }

    /// Drops members whose receivers are gone.
    fn prune(&mut self) {
        self.senders.retain(|sender| !sender.is_closed());
    }
}

// ============================================================================
// SECTION: Memory Bus
// ============================================================================

/// Process-local [`Bus`] implementation.
///
/// # Invariants
/// - Broadcast subscribers each receive a copy of matching messages.
/// - Queue-group members share delivery round-robin.
#[derive(Clone, Default)]
pub struct MemoryBus {
    /// Registered subscription endpoints.
    endpoints: Arc<Mutex<Vec<Endpoint>>>,
}

impl MemoryBus {
    /// Creates an empty in-memory bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscription endpoint and returns its drain handle.
    fn register(&self, pattern: &str, queue_group: Option<&str>) -> BusSubscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let mut endpoints = self.endpoints.lock();
        if let Some(group) = queue_group
            && let Some(endpoint) = endpoints
                .iter_mut()
                .find(|e| e.pattern == pattern && e.queue_group.as_deref() == Some(group))
        {
            endpoint.prune();
            endpoint.senders.push(sender);
            return BusSubscription::new(receiver);
        }
        endpoints.push(Endpoint {
            pattern: pattern.to_string(),
            queue_group: queue_group.map(ToString::to_string),
            senders: vec![sender],
            cursor: AtomicUsize::new(0),
        });
        BusSubscription::new(receiver)
    }

    /// Fans a message out to every matching endpoint.
    fn dispatch(&self, message: &BusMessage) {
        let mut endpoints = self.endpoints.lock();
        endpoints.retain_mut(|endpoint| {
            endpoint.prune();
            !endpoint.senders.is_empty()
        });
        for endpoint in endpoints.iter() {
            if subject_matches(&endpoint.pattern, &message.subject) {
                endpoint.deliver(message);
            }
        }
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.publish_with_headers(subject, Headers::new(), payload).await
    }

    async fn publish_with_headers(
        &self,
        subject: &str,
        headers: Headers,
        payload: Bytes,
    ) -> Result<(), BusError> {
        self.dispatch(&BusMessage {
            subject: subject.to_string(),
            headers,
            payload,
            reply: None,
        });
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError> {
        Ok(self.register(subject, None))
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<BusSubscription, BusError> {
        Ok(self.register(subject, Some(queue_group)))
    }

    async fn request(
        &self,
        subject: &str,
        headers: Headers,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<BusMessage, BusError> {
        let reply_subject = format!("_INBOX.{}", Uuid::new_v4());
        let mut inbox = self.register(&reply_subject, None);
        self.dispatch(&BusMessage {
            subject: subject.to_string(),
            headers,
            payload,
            reply: Some(reply_subject),
        });
        match tokio::time::timeout(timeout, inbox.next()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(BusError::Request("reply channel closed".to_string())),
            Err(_) => Err(BusError::Timeout(timeout)),
        }
    }

    async fn respond(&self, message: &BusMessage, payload: Bytes) -> Result<(), BusError> {
        let reply = message
            .reply
            .as_ref()
            .ok_or_else(|| BusError::MissingReply(message.subject.clone()))?;
        self.dispatch(&BusMessage {
            subject: reply.clone(),
            headers: Headers::new(),
            payload,
            reply: None,
        });
        Ok(())
    }

    fn connected(&self) -> bool {
        true
    }
}
