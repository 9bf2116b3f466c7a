//! Consumer-side accessor for the aggregation service
//!
//! The bridge is how UI or IPC layers reach the service: it finds the live
//! instance through the [`ServiceSlot`], keeps its own subscriber alive, and
//! degrades to empty results when no service is running.

use std::sync::Arc;

use tracing::debug;

use super::handle::ServiceSlot;
use super::ports::AggregateSubscriber;
use crate::domain::aggregate::AggregateSnapshot;
use crate::domain::listener::ServiceState;

/// Bridge between a consumer and whichever service instance is live
pub struct AggregationBridge {
    slot: ServiceSlot,
    subscriber: Arc<dyn AggregateSubscriber>,
}

impl AggregationBridge {
    /// Create a bridge and register its subscriber with the live service, if any
    pub fn new(slot: ServiceSlot, subscriber: Arc<dyn AggregateSubscriber>) -> Self {
        let bridge = Self { slot, subscriber };
        if !bridge.attach() {
            debug!("no aggregation service running, subscriber not attached yet");
        }
        bridge
    }

    /// Register this bridge's subscriber with the live service.
    ///
    /// Returns false when no service is running.
    pub fn attach(&self) -> bool {
        match self.slot.get() {
            Some(service) => {
                service.register_subscriber(&self.subscriber);
                true
            }
            None => false,
        }
    }

    /// Current aggregate, empty when no service is running
    pub fn query(&self) -> AggregateSnapshot {
        self.slot
            .get()
            .map(|service| service.query())
            .unwrap_or_default()
    }

    /// Active item count for one source, 0 when unknown or no service is running
    pub fn count_for(&self, source: &str) -> u32 {
        self.slot
            .get()
            .map(|service| service.count_for(source))
            .unwrap_or(0)
    }

    /// Re-attach and trigger a recompute.
    ///
    /// Returns false (and does nothing) when no service is running.
    pub fn refresh(&self) -> bool {
        let Some(service) = self.slot.get() else {
            debug!("refresh ignored, no aggregation service running");
            return false;
        };
        service.register_subscriber(&self.subscriber);
        service.refresh();
        true
    }

    /// Lifecycle state of the live service, `Stopped` when none is published
    pub fn status(&self) -> ServiceState {
        self.slot
            .get()
            .map(|service| service.state())
            .unwrap_or(ServiceState::Stopped)
    }

    /// Whether the platform has granted the listener connection
    pub fn is_listener_connected(&self) -> bool {
        self.slot
            .get()
            .is_some_and(|service| service.is_connected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ActiveItemSource, DeliveryError, EnumerationError};
    use crate::application::NotificationAggregationService;
    use crate::domain::aggregate::{ActiveItem, SourceId};
    use crate::domain::listener::LifecycleEvent;
    use std::sync::Mutex;

    struct FixedSource(Vec<ActiveItem>);

    impl ActiveItemSource for FixedSource {
        fn enumerate_active_items(&self) -> Result<Vec<ActiveItem>, EnumerationError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct CountingSubscriber {
        pushes: Mutex<usize>,
    }

    impl AggregateSubscriber for CountingSubscriber {
        fn on_aggregate_changed(&self, _snapshot: &AggregateSnapshot) -> Result<(), DeliveryError> {
            *self.pushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn start_service(slot: &ServiceSlot) -> Arc<NotificationAggregationService> {
        let items = vec![
            ActiveItem::new(SourceId::new("chat").unwrap(), "1"),
            ActiveItem::new(SourceId::new("chat").unwrap(), "2"),
        ];
        let service = Arc::new(NotificationAggregationService::new(Arc::new(FixedSource(
            items,
        ))));
        service.start(slot).unwrap();
        service
    }

    #[test]
    fn without_service_everything_is_empty() {
        let bridge = AggregationBridge::new(
            ServiceSlot::new(),
            Arc::new(CountingSubscriber::default()),
        );
        assert!(bridge.query().is_empty());
        assert_eq!(bridge.count_for("chat"), 0);
        assert!(!bridge.refresh());
        assert_eq!(bridge.status(), ServiceState::Stopped);
        assert!(!bridge.is_listener_connected());
    }

    #[test]
    fn attaches_on_construction_and_receives_pushes() {
        let slot = ServiceSlot::new();
        let service = start_service(&slot);
        let subscriber = Arc::new(CountingSubscriber::default());
        let bridge = AggregationBridge::new(slot.clone(), subscriber.clone());

        service.on_item_lifecycle_event(LifecycleEvent::Connected);

        assert_eq!(*subscriber.pushes.lock().unwrap(), 1);
        assert_eq!(bridge.count_for("chat"), 2);
        assert_eq!(bridge.status(), ServiceState::Running);
        assert!(bridge.is_listener_connected());
    }

    #[test]
    fn refresh_reattaches_after_restart() {
        let slot = ServiceSlot::new();
        let first = start_service(&slot);
        let subscriber = Arc::new(CountingSubscriber::default());
        let bridge = AggregationBridge::new(slot.clone(), subscriber.clone());
        first.stop(&slot).unwrap();

        let second = start_service(&slot);
        second.on_item_lifecycle_event(LifecycleEvent::Connected);
        assert_eq!(*subscriber.pushes.lock().unwrap(), 0);

        assert!(bridge.refresh());
        assert_eq!(*subscriber.pushes.lock().unwrap(), 1);
        assert_eq!(bridge.query().count_for("chat"), 2);
    }

    #[test]
    fn refresh_before_connection_yields_empty() {
        let slot = ServiceSlot::new();
        let _service = start_service(&slot);
        let bridge = AggregationBridge::new(slot, Arc::new(CountingSubscriber::default()));

        assert!(bridge.refresh());
        assert!(bridge.query().is_empty());
        assert_eq!(bridge.status(), ServiceState::Starting);
    }
}
