// crates/aegisflux-decision/src/store.rs
// ============================================================================
// Module: Plan Store
// Description: Bounded in-memory plan map with lifecycle events.
// Purpose: Persist plans, evict oldest-first, and announce changes.
// Dependencies: aegisflux-bus, aegisflux-core, parking_lot, tokio
// ============================================================================

//! ## Overview
//! Plans live in a bounded map (capacity default 1000). Inserting into a
//! full store evicts the oldest `created_at`. Store, update, and delete
//! publish `plans.created`, `plans.updated`, and `plans.deleted`
//! asynchronously so callers never block on the bus. A background sweeper
//! removes plans whose `expires_at` has passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aegisflux_bus::Bus;
use aegisflux_bus::DEFAULT_PUBLISH_TIMEOUT;
use aegisflux_bus::Headers;
use aegisflux_core::CoreError;
use aegisflux_core::Plan;
use aegisflux_core::PlanId;
use aegisflux_core::PlanStatus;
use aegisflux_core::core::time::now_unix_millis;
use bytes::Bytes;
use parking_lot::Mutex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default store capacity.
pub const DEFAULT_PLAN_CAPACITY: usize = 1000;

/// Interval between expiry sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Store
// ============================================================================

/// Bounded plan store with lifecycle announcements.
///
/// # Invariants
/// - Size never exceeds the configured capacity.
/// - Eviction always chooses the oldest `created_at`.
pub struct PlanStore {
    /// Plans keyed by id.
    inner: Mutex<HashMap<PlanId, Plan>>,
    /// Maximum retained plans.
    capacity: usize,
    /// Bus for lifecycle events.
    bus: Arc<dyn Bus>,
}

impl PlanStore {
    /// Creates a store bounded by `capacity` (minimum 1).
    #[must_use]
    pub fn new(capacity: usize, bus: Arc<dyn Bus>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            bus,
        })
    }

    /// Stores a plan, evicting the oldest when full.
    ///
    /// Publishes `plans.created` asynchronously. Returns the evicted plan,
    /// when any.
    pub fn store(&self, plan: Plan) -> Option<Plan> {
        let evicted = {
            let mut inner = self.inner.lock();
            let evicted = if inner.len() >= self.capacity && !inner.contains_key(&plan.id) {
                inner
                    .values()
                    .min_by_key(|existing| existing.created_at)
                    .map(|oldest| oldest.id.clone())
                    .and_then(|oldest| inner.remove(&oldest))
            } else {
                None
            };
            inner.insert(plan.id.clone(), plan.clone());
            evicted
        };
        self.announce("created", plan);
        evicted
    }

    /// Replaces an existing plan, stamping `updated_at`.
    ///
    /// Publishes `plans.updated` asynchronously.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown plan ids.
    pub fn update(&self, mut plan: Plan) -> Result<(), CoreError> {
        plan.updated_at = now_unix_millis();
        {
            let mut inner = self.inner.lock();
            if !inner.contains_key(&plan.id) {
                return Err(CoreError::NotFound(format!("plan {}", plan.id)));
            }
            inner.insert(plan.id.clone(), plan.clone());
        }
        self.announce("updated", plan);
        Ok(())
    }

    /// Removes a plan.
    ///
    /// Publishes `plans.deleted` asynchronously.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown plan ids.
    pub fn delete(&self, id: &PlanId) -> Result<Plan, CoreError> {
        let removed = self
            .inner
            .lock()
            .remove(id)
            .ok_or_else(|| CoreError::NotFound(format!("plan {id}")))?;
        self.announce("deleted", removed.clone());
        Ok(removed)
    }

    /// Returns a plan by id.
    #[must_use]
    pub fn get(&self, id: &PlanId) -> Option<Plan> {
        self.inner.lock().get(id).cloned()
    }

    /// Lists plans newest-first with an optional status filter.
    #[must_use]
    pub fn list(&self, status: Option<PlanStatus>, limit: usize) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self
            .inner
            .lock()
            .values()
            .filter(|plan| status.is_none_or(|wanted| plan.status == wanted))
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans.truncate(limit.max(1));
        plans
    }

    /// Returns the number of stored plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true when no plans are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Removes plans whose `expires_at` is in the past; returns the count.
    pub fn sweep(&self, now: i64) -> usize {
        let expired: Vec<Plan> = {
            let mut inner = self.inner.lock();
            let ids: Vec<PlanId> = inner
                .values()
                .filter(|plan| plan.expires_at > 0 && plan.expires_at < now)
                .map(|plan| plan.id.clone())
                .collect();
            ids.into_iter().filter_map(|id| inner.remove(&id)).collect()
        };
        let count = expired.len();
        for plan in expired {
            self.announce("deleted", plan);
        }
        count
    }

    /// Periodically sweeps expired plans until the task is aborted.
    pub async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = self.sweep(now_unix_millis());
            if removed > 0 {
                tracing::debug!(removed, "expired plans swept");
            }
        }
    }

    /// Publishes a lifecycle event without blocking the caller.
    fn announce(&self, event_type: &'static str, plan: Plan) {
        let bus = Arc::clone(&self.bus);
        tokio::spawn(async move {
            let subject = format!("plans.{event_type}");
            let payload = match serde_json::to_vec(&plan) {
                Ok(payload) => Bytes::from(payload),
                Err(err) => {
                    tracing::warn!(error = %err, "plan lifecycle serialization failed");
                    return;
                }
            };
            let mut headers = Headers::new();
            headers.insert("x-plan-id".to_string(), plan.id.to_string());
            let publish = bus.publish_with_headers(&subject, headers, payload);
            match tokio::time::timeout(DEFAULT_PUBLISH_TIMEOUT, publish).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(subject, error = %err, "plan lifecycle publish failed");
                }
                Err(_) => {
                    tracing::warn!(subject, "plan lifecycle publish timed out");
                }
            }
        });
    }
}
