//! Notification aggregation service
//!
//! Receives platform lifecycle callbacks, rebuilds the per-source counts from
//! the platform's ground truth, stores the result, and pushes it to the
//! registered subscriber.
//!
//! Every event triggers a full re-enumeration instead of adjusting counters:
//! the platform may drop, duplicate, or reorder callbacks, and a rescan makes
//! the handler idempotent. Do not replace this with increment/decrement.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, trace, warn};

use super::handle::ServiceSlot;
use super::ports::{ActiveItemSource, AggregateSubscriber, EnumerationError, LifecycleListener};
use super::registry::{panic_message, PushOutcome, SubscriberRegistry};
use super::store::AggregateStore;
use crate::domain::aggregate::AggregateSnapshot;
use crate::domain::listener::{
    InvalidStateTransition, LifecycleEvent, ServiceLifecycle, ServiceState,
};

/// The listener service.
///
/// The external host owns `start`/`stop`; the platform drives
/// `on_item_lifecycle_event`; consumers call `query`/`refresh`, usually through
/// an [`AggregationBridge`](super::bridge::AggregationBridge).
pub struct NotificationAggregationService {
    source: Arc<dyn ActiveItemSource>,
    store: AggregateStore,
    subscribers: SubscriberRegistry,
    lifecycle: Mutex<ServiceLifecycle>,
    /// Serializes enumerate -> replace -> push so pushes arrive in store order
    recompute_gate: Mutex<()>,
}

impl NotificationAggregationService {
    /// Create a stopped service reading ground truth from `source`
    pub fn new(source: Arc<dyn ActiveItemSource>) -> Self {
        Self {
            source,
            store: AggregateStore::new(),
            subscribers: SubscriberRegistry::new(),
            lifecycle: Mutex::new(ServiceLifecycle::new()),
            recompute_gate: Mutex::new(()),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, ServiceLifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        self.lifecycle().state()
    }

    /// Whether the platform connection is live
    pub fn is_connected(&self) -> bool {
        self.lifecycle().is_connected()
    }

    /// Start the service and publish it as the process-wide instance.
    ///
    /// A different instance already published in `slot` is stopped first.
    pub fn start(self: &Arc<Self>, slot: &ServiceSlot) -> Result<(), InvalidStateTransition> {
        self.lifecycle().start()?;
        info!("aggregation service starting");

        if let Some(previous) = slot.publish(Arc::clone(self)) {
            if !Arc::ptr_eq(&previous, self) {
                warn!("replacing a live aggregation service instance");
                if let Err(e) = previous.stop(slot) {
                    debug!(error = %e, "previous instance was already stopping");
                }
            }
        }
        Ok(())
    }

    /// Stop the service.
    ///
    /// Waits for an in-flight recompute, drops the subscriber (it must register
    /// again after a restart), withdraws the instance from `slot`, and forgets
    /// the counts.
    pub fn stop(&self, slot: &ServiceSlot) -> Result<(), InvalidStateTransition> {
        self.lifecycle().begin_stop()?;
        info!("aggregation service stopping");

        let _gate = self.recompute_gate.lock().unwrap_or_else(|e| e.into_inner());
        self.subscribers.clear();
        slot.clear_if(self);
        self.store.reset();
        self.lifecycle().finish_stop()?;

        info!("aggregation service stopped");
        Ok(())
    }

    /// Handle a platform callback.
    ///
    /// Item payloads are ignored; posts and removals just trigger a recompute.
    pub fn on_item_lifecycle_event(&self, event: LifecycleEvent) {
        trace!(event = %event, "lifecycle event");
        match event {
            LifecycleEvent::Connected => {
                if let Err(e) = self.lifecycle().connect() {
                    debug!(error = %e, "ignoring listener connect");
                    return;
                }
                info!("platform listener connected");
                self.recompute();
            }
            LifecycleEvent::Disconnected => match self.lifecycle().disconnect() {
                Ok(()) => info!("platform listener disconnected"),
                Err(e) => debug!(error = %e, "ignoring listener disconnect"),
            },
            LifecycleEvent::Posted(_) | LifecycleEvent::Removed(_) => {
                self.recompute();
            }
        }
    }

    /// Rebuild the aggregate from the platform's active items.
    ///
    /// Returns an empty snapshot without touching the store while the listener
    /// is not connected, and the retained previous snapshot if enumeration fails.
    pub fn recompute(&self) -> AggregateSnapshot {
        let _gate = self.recompute_gate.lock().unwrap_or_else(|e| e.into_inner());

        if !self.lifecycle().can_recompute() {
            debug!(state = %self.state(), "recompute skipped, listener not connected");
            return AggregateSnapshot::empty();
        }

        let enumerated = panic::catch_unwind(AssertUnwindSafe(|| {
            self.source.enumerate_active_items()
        }))
        .unwrap_or_else(|payload| {
            Err(EnumerationError::Unavailable(panic_message(payload.as_ref())))
        });

        let items = match enumerated {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "enumeration failed, keeping previous aggregate");
                return self.store.read();
            }
        };

        let snapshot = AggregateSnapshot::from_items(&items);
        self.store.replace(snapshot.clone());
        debug!(
            sources = snapshot.len(),
            items = snapshot.total(),
            "aggregate recomputed"
        );

        let live = {
            let mut lifecycle = self.lifecycle();
            if matches!(lifecycle.mark_running(), Ok(true)) {
                info!("aggregation service running");
            }
            lifecycle.state().is_live()
        };

        if live {
            let outcome = self.subscribers.notify(&snapshot);
            if outcome != PushOutcome::Delivered {
                trace!(?outcome, "aggregate not pushed");
            }
        }

        snapshot
    }

    /// Manual recompute for callers that suspect the aggregate is stale
    pub fn refresh(&self) -> AggregateSnapshot {
        debug!("manual refresh requested");
        self.recompute()
    }

    /// Result of the most recent successful recompute
    pub fn query(&self) -> AggregateSnapshot {
        self.store.read()
    }

    /// Active item count for one source, 0 if unknown
    pub fn count_for(&self, source: &str) -> u32 {
        self.store.read().count_for(source)
    }

    /// Register the push target, replacing any previous one
    pub fn register_subscriber(&self, subscriber: &Arc<dyn AggregateSubscriber>) {
        if self.subscribers.register(subscriber) {
            debug!("replaced previous subscriber");
        }
    }

    /// Whether a live subscriber is registered
    pub fn has_subscriber(&self) -> bool {
        self.subscribers.is_registered()
    }
}

impl LifecycleListener for NotificationAggregationService {
    fn on_lifecycle_event(&self, event: LifecycleEvent) {
        self.on_item_lifecycle_event(event);
    }
}

impl fmt::Debug for NotificationAggregationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationAggregationService")
            .field("state", &self.state())
            .field("connected", &self.is_connected())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}
