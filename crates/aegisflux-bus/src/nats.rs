// crates/aegisflux-bus/src/nats.rs
// ============================================================================
// Module: NATS Bus
// Description: async-nats client adapter for the Bus trait.
// Purpose: Provide the production bus with reconnect backoff and headers.
// Dependencies: async-nats, bytes, futures, tokio, tracing
// ============================================================================

//! ## Overview
//! [`NatsBus`] adapts an [`async_nats::Client`] to the [`Bus`] trait.
//! Reconnection is delegated to the client with an exponential backoff
//! schedule; connection events are logged. Publishes flush the client so
//! transport failures surface to the caller instead of dying in a buffer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_nats::ConnectOptions;
use async_nats::connection::State;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::bus::Bus;
use crate::bus::BusError;
use crate::bus::BusMessage;
use crate::bus::BusSubscription;
use crate::bus::Headers;
use crate::bus::SUBSCRIPTION_CAPACITY;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection configuration for [`NatsBus`].
///
/// # Invariants
/// - `reconnect_base_delay` seeds the backoff; `reconnect_max_delay` caps it.
#[derive(Debug, Clone)]
pub struct NatsBusConfig {
    /// Server URL, e.g. `nats://127.0.0.1:4222`.
    pub url: String,
    /// First reconnect delay.
    pub reconnect_base_delay: Duration,
    /// Upper bound for the backoff schedule.
    pub reconnect_max_delay: Duration,
}

impl Default for NatsBusConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            reconnect_base_delay: Duration::from_millis(250),
            reconnect_max_delay: Duration::from_secs(15),
        }
    }
}

// ============================================================================
// SECTION: NATS Bus
// ============================================================================

/// Production [`Bus`] backed by a NATS client.
pub struct NatsBus {
    /// Connected client; reconnection is handled internally.
    client: async_nats::Client,
}

impl NatsBus {
    /// Connects to the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Connect`] when the initial connection cannot be
    /// established.
    pub async fn connect(config: NatsBusConfig) -> Result<Self, BusError> {
        let base = config.reconnect_base_delay;
        let cap = config.reconnect_max_delay;
        let client = ConnectOptions::new()
            .retry_on_initial_connect()
            .max_reconnects(None)
            .reconnect_delay_callback(move |attempts| {
                let shift = u32::try_from(attempts.min(16)).unwrap_or(16);
                base.saturating_mul(2u32.saturating_pow(shift)).min(cap)
            })
            .event_callback(|event| async move {
                tracing::warn!(event = %event, "bus connection event");
            })
            .connect(config.url.clone())
            .await
            .map_err(|err| BusError::Connect(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    /// Wraps an already-connected client.
    #[must_use]
    pub const fn from_client(client: async_nats::Client) -> Self {
        Self {
            client,
        }
    }

    /// Pumps a NATS subscriber into a [`BusSubscription`] channel.
    fn pump(mut subscriber: async_nats::Subscriber) -> BusSubscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                if sender.send(convert_message(message)).await.is_err() {
                    break;
                }
            }
        });
        BusSubscription::new(receiver)
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|err| BusError::Publish(err.to_string()))?;
        self.client.flush().await.map_err(|err| BusError::Publish(err.to_string()))
    }

    async fn publish_with_headers(
        &self,
        subject: &str,
        headers: Headers,
        payload: Bytes,
    ) -> Result<(), BusError> {
        self.client
            .publish_with_headers(subject.to_string(), to_nats_headers(&headers), payload)
            .await
            .map_err(|err| BusError::Publish(err.to_string()))?;
        self.client.flush().await.map_err(|err| BusError::Publish(err.to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|err| BusError::Subscribe(err.to_string()))?;
        Ok(Self::pump(subscriber))
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<BusSubscription, BusError> {
        let subscriber = self
            .client
            .queue_subscribe(subject.to_string(), queue_group.to_string())
            .await
            .map_err(|err| BusError::Subscribe(err.to_string()))?;
        Ok(Self::pump(subscriber))
    }

    async fn request(
        &self,
        subject: &str,
        headers: Headers,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<BusMessage, BusError> {
        let request = async_nats::Request::new()
            .headers(to_nats_headers(&headers))
            .payload(payload);
        let pending = self.client.send_request(subject.to_string(), request);
        match tokio::time::timeout(timeout, pending).await {
            Ok(Ok(message)) => Ok(convert_message(message)),
            Ok(Err(err)) => Err(BusError::Request(err.to_string())),
            Err(_) => Err(BusError::Timeout(timeout)),
        }
    }

    async fn respond(&self, message: &BusMessage, payload: Bytes) -> Result<(), BusError> {
        let reply = message
            .reply
            .as_ref()
            .ok_or_else(|| BusError::MissingReply(message.subject.clone()))?;
        self.publish(reply, payload).await
    }

    fn connected(&self) -> bool {
        self.client.connection_state() == State::Connected
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Converts a flat header map into NATS headers.
fn to_nats_headers(headers: &Headers) -> async_nats::HeaderMap {
    let mut out = async_nats::HeaderMap::new();
    for (name, value) in headers {
        out.insert(name.as_str(), value.as_str());
    }
    out
}

/// Converts a NATS message into the bus wire type.
fn convert_message(message: async_nats::Message) -> BusMessage {
    let mut headers = Headers::new();
    if let Some(map) = &message.headers {
        for (name, values) in map.iter() {
            if let Some(value) = values.first() {
                headers.insert(name.to_string(), value.to_string());
            }
        }
    }
    BusMessage {
        subject: message.subject.to_string(),
        headers,
        payload: message.payload,
        reply: message.reply.map(|subject| subject.to_string()),
    }
}
