// crates/aegisflux-correlator/src/publisher.rs
// ============================================================================
// Module: Finding Publisher
// Description: Finding serialization and bus publication paths.
// Purpose: Publish findings with headers, retry, ack, and dedup variants.
// Dependencies: aegisflux-bus, aegisflux-core, bytes, serde, tokio
// ============================================================================

//! ## Overview
//! Findings go out on `correlator.findings` with the header set
//! `x-finding-id`, `x-host-id`, `x-rule-id`, `x-severity`, `x-timestamp`,
//! and `x-correlation-id`. The retry path makes up to three attempts with
//! exponential backoff from a 100 ms base. The ack path sets
//! `x-require-ack: true`, treats the reply as `{status, message}`, and
//! surfaces any non-`ok` status as a publish failure within the ack
//! timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use aegisflux_bus::Bus;
use aegisflux_bus::CORRELATOR_FINDINGS;
use aegisflux_bus::Headers;
use aegisflux_core::CoreError;
use aegisflux_core::Finding;
use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Publisher retry and ack configuration.
///
/// # Invariants
/// - `retry_attempts` counts total attempts, not retries after the first.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Total publish attempts for the retry path.
    pub retry_attempts: u32,
    /// Base delay for exponential backoff.
    pub retry_base_delay: Duration,
    /// Deadline for the ack request/reply exchange.
    pub ack_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            ack_timeout: Duration::from_secs(2),
        }
    }
}

// ============================================================================
// SECTION: Ack Reply
// ============================================================================

/// JSON reply shape for acked publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckReply {
    /// `ok` on success; anything else is a failure.
    pub status: String,
    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// SECTION: Publisher
// ============================================================================

/// Serializes findings and publishes them on the bus.
pub struct FindingPublisher {
    /// Bus handle.
    bus: Arc<dyn Bus>,
    /// Retry and ack configuration.
    config: PublisherConfig,
}

impl FindingPublisher {
    /// Creates a publisher over a bus handle.
    #[must_use]
    pub fn new(bus: Arc<dyn Bus>, config: PublisherConfig) -> Self {
        Self {
            bus,
            config,
        }
    }

    /// Builds the finding header set.
    #[must_use]
    pub fn headers_for(finding: &Finding) -> Headers {
        let mut headers = Headers::new();
        headers.insert("x-finding-id".to_string(), finding.id.to_string());
        headers.insert("x-host-id".to_string(), finding.host_id.to_string());
        headers.insert("x-rule-id".to_string(), finding.rule_id.to_string());
        headers.insert("x-severity".to_string(), finding.severity.as_str().to_string());
        headers.insert("x-timestamp".to_string(), finding.timestamp.to_string());
        if let Some(correlation_id) = &finding.correlation_id {
            headers.insert("x-correlation-id".to_string(), correlation_id.to_string());
        }
        headers
    }

    /// Serializes a finding for the wire.
    fn encode(finding: &Finding) -> Result<Bytes, CoreError> {
        serde_json::to_vec(finding)
            .map(Bytes::from)
            .map_err(|err| CoreError::Internal(format!("finding serialization failed: {err}")))
    }

    /// Publishes one finding without retry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] on transport failure.
    pub async fn publish(&self, finding: &Finding) -> Result<(), CoreError> {
        let payload = Self::encode(finding)?;
        self.bus
            .publish_with_headers(CORRELATOR_FINDINGS, Self::headers_for(finding), payload)
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))
    }

    /// Publishes a batch, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first transport failure; previously published findings
    /// stay published (at-least-once semantics).
    pub async fn publish_batch(&self, findings: &[Finding]) -> Result<usize, CoreError> {
        for (index, finding) in findings.iter().enumerate() {
            if let Err(err) = self.publish(finding).await {
                tracing::warn!(
                    published = index,
                    total = findings.len(),
                    error = %err,
                    "finding batch publish aborted"
                );
                return Err(err);
            }
        }
        Ok(findings.len())
    }

    /// Publishes with bounded retry and exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] after the final attempt fails.
    pub async fn publish_with_retry(&self, finding: &Finding) -> Result<(), CoreError> {
        let attempts = self.config.retry_attempts.max(1);
        let mut last_err = CoreError::Unavailable("no publish attempt was made".to_string());
        for attempt in 0 .. attempts {
            match self.publish(finding).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    last_err = err;
                    if attempt + 1 < attempts {
                        let delay = self
                            .config
                            .retry_base_delay
                            .saturating_mul(2u32.saturating_pow(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    /// Publishes as a request and requires an `ok` ack reply.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] on timeout, transport failure, an
    /// undecodable reply, or a non-`ok` status.
    pub async fn publish_with_ack(&self, finding: &Finding) -> Result<(), CoreError> {
        let payload = Self::encode(finding)?;
        let mut headers = Self::headers_for(finding);
        headers.insert("x-require-ack".to_string(), "true".to_string());
        let reply = self
            .bus
            .request(CORRELATOR_FINDINGS, headers, payload, self.config.ack_timeout)
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;
        let ack: AckReply = serde_json::from_slice(&reply.payload)
            .map_err(|err| CoreError::Unavailable(format!("undecodable ack reply: {err}")))?;
        if ack.status == "ok" {
            Ok(())
        } else {
            Err(CoreError::Unavailable(format!(
                "finding {} rejected by consumer: {}",
                finding.id,
                ack.message.unwrap_or_else(|| ack.status.clone())
            )))
        }
    }

    /// Publishes with an explicit dedup key header for consumer-side dedup.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] on transport failure.
    pub async fn publish_with_dedup_key(
        &self,
        finding: &Finding,
        dedup_key: &str,
    ) -> Result<(), CoreError> {
        let payload = Self::encode(finding)?;
        let mut headers = Self::headers_for(finding);
        headers.insert("x-dedup-key".to_string(), dedup_key.to_string());
        self.bus
            .publish_with_headers(CORRELATOR_FINDINGS, headers, payload)
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))
    }
}
