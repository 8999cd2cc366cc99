// crates/aegisflux-config/src/manager.rs
// ============================================================================
// Module: Config Manager
// Description: Snapshot fetch, live updates, and subscriber fan-out.
// Purpose: Own the copy-on-write config snapshot pointer.
// Dependencies: aegisflux-bus, arc-swap, reqwest, tokio
// ============================================================================

//! ## Overview
//! [`ConfigManager`] owns the current [`ConfigSnapshot`] behind an atomic
//! pointer. Startup fetches `GET /config` with a 10 second deadline and
//! falls back to env-derived defaults on failure. A bus task applies
//! `config.changed` messages; each change swaps in a new snapshot and
//! notifies watch subscribers with the new pointer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use aegisflux_bus::Bus;
use aegisflux_bus::BusError;
use aegisflux_bus::CONFIG_CHANGED;
use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::watch;

use crate::snapshot::ConfigChange;
use crate::snapshot::ConfigEntry;
use crate::snapshot::ConfigSnapshot;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Deadline for the startup configuration fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by the config manager.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config API fetch failed.
    #[error("config fetch failure: {0}")]
    Fetch(String),
    /// Config API returned an undecodable body.
    #[error("config decode failure: {0}")]
    Decode(String),
    /// Bus subscription failed.
    #[error("config bus failure: {0}")]
    Bus(#[from] BusError),
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Owner of the live configuration snapshot.
///
/// # Invariants
/// - The snapshot pointer is read via atomic load and written via swap;
///   readers observe old-or-new, never a torn value.
pub struct ConfigManager {
    /// Current snapshot pointer.
    current: ArcSwap<ConfigSnapshot>,
    /// Watch channel notifying subscribers of replacements.
    sender: watch::Sender<Arc<ConfigSnapshot>>,
}

impl ConfigManager {
    /// Creates a manager seeded with the provided snapshot.
    #[must_use]
    pub fn new(initial: ConfigSnapshot) -> Arc<Self> {
        let initial = Arc::new(initial);
        let (sender, _) = watch::channel(Arc::clone(&initial));
        Arc::new(Self {
            current: ArcSwap::new(initial),
            sender,
        })
    }

    /// Fetches the initial snapshot from the config API, falling back to the
    /// provided snapshot when the fetch fails or no URL is configured.
    pub async fn bootstrap(api_url: Option<&str>, fallback: ConfigSnapshot) -> Arc<Self> {
        let initial = match api_url {
            Some(url) => match fetch_snapshot(url, FETCH_TIMEOUT).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(error = %err, "config fetch failed, using env defaults");
                    fallback
                }
            },
            None => fallback,
        };
        Self::new(initial)
    }

    /// Returns the current snapshot pointer.
    #[must_use]
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    /// Returns a watch receiver observing snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.sender.subscribe()
    }

    /// Applies one change message, swapping in a new snapshot.
    pub fn apply_change(&self, change: &ConfigChange) {
        let next = Arc::new(self.current.load().with_change(change));
        self.current.store(Arc::clone(&next));
        self.sender.send_replace(next);
        tracing::info!(key = %change.key, "applied config change");
    }

    /// Refetches the snapshot from the config API and swaps it in.
    ///
    /// Refresh is idempotent: refetching an unchanged config yields an
    /// equal snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Fetch`] or [`ConfigError::Decode`] when the
    /// API cannot be read; the current snapshot stays in place.
    pub async fn refresh(&self, api_url: &str) -> Result<(), ConfigError> {
        let snapshot = Arc::new(fetch_snapshot(api_url, FETCH_TIMEOUT).await?);
        self.current.store(Arc::clone(&snapshot));
        self.sender.send_replace(snapshot);
        Ok(())
    }

    /// Consumes `config.changed` messages until the subscription closes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bus`] when the subscription cannot be set up.
    pub async fn run(self: Arc<Self>, bus: Arc<dyn Bus>) -> Result<(), ConfigError> {
        let mut subscription = bus.subscribe(CONFIG_CHANGED).await?;
        while let Some(message) = subscription.next().await {
            match serde_json::from_slice::<ConfigChange>(&message.payload) {
                Ok(change) => self.apply_change(&change),
                Err(err) => {
                    tracing::warn!(error = %err, "discarding malformed config change");
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Fetch
// ============================================================================

/// Fetches and decodes `GET {api_url}/config`.
async fn fetch_snapshot(api_url: &str, timeout: Duration) -> Result<ConfigSnapshot, ConfigError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ConfigError::Fetch(err.to_string()))?;
    let url = format!("{}/config", api_url.trim_end_matches('/'));
    let response =
        client.get(&url).send().await.map_err(|err| ConfigError::Fetch(err.to_string()))?;
    if !response.status().is_success() {
        return Err(ConfigError::Fetch(format!("{url} returned {}", response.status())));
    }
    let entries: Vec<ConfigEntry> =
        response.json().await.map_err(|err| ConfigError::Decode(err.to_string()))?;
    Ok(ConfigSnapshot::from_entries(&entries))
}
