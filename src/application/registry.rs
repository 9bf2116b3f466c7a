//! Subscriber registry - at most one live push target

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use super::ports::{AggregateSubscriber, DeliveryError};
use crate::domain::aggregate::AggregateSnapshot;

/// Result of a push attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Handed to the subscriber
    Delivered,
    /// Nobody registered, or the registered subscriber has been dropped
    NoSubscriber,
    /// Subscriber present but its downstream sink refused the snapshot
    Dropped,
}

/// Holds a weak reference to the current subscriber.
///
/// The registry never owns the subscriber: whoever registered it keeps it
/// alive. Registering replaces any previous subscriber.
#[derive(Default)]
pub struct SubscriberRegistry {
    current: Mutex<Option<Weak<dyn AggregateSubscriber>>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, replacing any previous one.
    ///
    /// Returns true if a still-live subscriber was replaced.
    pub fn register(&self, subscriber: &Arc<dyn AggregateSubscriber>) -> bool {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let replaced = guard
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|previous| !Arc::ptr_eq(&previous, subscriber));
        *guard = Some(Arc::downgrade(subscriber));
        replaced
    }

    /// Drop the current subscriber. Returns true if one was registered.
    pub fn clear(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    /// Check whether a live subscriber is registered
    pub fn is_registered(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Push a snapshot to the current subscriber, if any.
    ///
    /// Liveness is checked under the lock right before sending, so a concurrent
    /// `clear` either happens first (nothing is sent) or after the send. A
    /// panicking subscriber counts as a dropped push and stays registered.
    pub fn notify(&self, snapshot: &AggregateSnapshot) -> PushOutcome {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());

        let live = guard.as_ref().and_then(Weak::upgrade);
        let Some(subscriber) = live else {
            if guard.take().is_some() {
                debug!("pruned dropped subscriber");
            }
            return PushOutcome::NoSubscriber;
        };

        let pushed = panic::catch_unwind(AssertUnwindSafe(|| {
            subscriber.on_aggregate_changed(snapshot)
        }))
        .unwrap_or_else(|payload| Err(DeliveryError::Failed(panic_message(payload.as_ref()))));

        match pushed {
            Ok(()) => PushOutcome::Delivered,
            Err(e @ DeliveryError::Failed(_)) => {
                warn!(error = %e, "subscriber failed, aggregate push dropped");
                PushOutcome::Dropped
            }
            Err(e) => {
                debug!(error = %e, "aggregate push dropped");
                PushOutcome::Dropped
            }
        }
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregate::{ActiveItem, SourceId};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingSubscriber {
        received: Mutex<Vec<AggregateSnapshot>>,
        disconnected: AtomicBool,
    }

    impl RecordingSubscriber {
        fn received(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    impl AggregateSubscriber for RecordingSubscriber {
        fn on_aggregate_changed(&self, snapshot: &AggregateSnapshot) -> Result<(), DeliveryError> {
            if self.disconnected.load(Ordering::SeqCst) {
                return Err(DeliveryError::Disconnected);
            }
            self.received.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    fn sample() -> AggregateSnapshot {
        let item = ActiveItem::new(SourceId::new("chat").unwrap(), "1");
        AggregateSnapshot::from_items(&[item])
    }

    #[test]
    fn notify_without_subscriber_is_noop() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.notify(&sample()), PushOutcome::NoSubscriber);
        assert!(!registry.is_registered());
    }

    #[test]
    fn notify_delivers_to_registered_subscriber() {
        let registry = SubscriberRegistry::new();
        let subscriber = Arc::new(RecordingSubscriber::default());
        let handle: Arc<dyn AggregateSubscriber> = subscriber.clone();

        assert!(!registry.register(&handle));
        assert_eq!(registry.notify(&sample()), PushOutcome::Delivered);
        assert_eq!(subscriber.received(), 1);
    }

    #[test]
    fn last_registration_wins() {
        let registry = SubscriberRegistry::new();
        let first = Arc::new(RecordingSubscriber::default());
        let second = Arc::new(RecordingSubscriber::default());
        let first_handle: Arc<dyn AggregateSubscriber> = first.clone();
        let second_handle: Arc<dyn AggregateSubscriber> = second.clone();

        registry.register(&first_handle);
        assert!(registry.register(&second_handle));
        registry.notify(&sample());

        assert_eq!(first.received(), 0);
        assert_eq!(second.received(), 1);
    }

    #[test]
    fn re_registering_same_subscriber_is_not_a_replacement() {
        let registry = SubscriberRegistry::new();
        let handle: Arc<dyn AggregateSubscriber> = Arc::new(RecordingSubscriber::default());
        registry.register(&handle);
        assert!(!registry.register(&handle));
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let registry = SubscriberRegistry::new();
        let handle: Arc<dyn AggregateSubscriber> = Arc::new(RecordingSubscriber::default());
        registry.register(&handle);
        drop(handle);

        assert!(!registry.is_registered());
        assert_eq!(registry.notify(&sample()), PushOutcome::NoSubscriber);
    }

    #[test]
    fn disconnected_subscriber_drops_silently() {
        let registry = SubscriberRegistry::new();
        let subscriber = Arc::new(RecordingSubscriber::default());
        subscriber.disconnected.store(true, Ordering::SeqCst);
        let handle: Arc<dyn AggregateSubscriber> = subscriber.clone();
        registry.register(&handle);

        assert_eq!(registry.notify(&sample()), PushOutcome::Dropped);
        assert_eq!(subscriber.received(), 0);
        // Still registered: it may reconnect to its sink later
        assert!(registry.is_registered());
    }

    #[test]
    fn clear_stops_pushes() {
        let registry = SubscriberRegistry::new();
        let subscriber = Arc::new(RecordingSubscriber::default());
        let handle: Arc<dyn AggregateSubscriber> = subscriber.clone();
        registry.register(&handle);

        assert!(registry.clear());
        assert_eq!(registry.notify(&sample()), PushOutcome::NoSubscriber);
        assert_eq!(subscriber.received(), 0);
        assert!(!registry.clear());
    }

    struct PanickingSubscriber;

    impl AggregateSubscriber for PanickingSubscriber {
        fn on_aggregate_changed(&self, _snapshot: &AggregateSnapshot) -> Result<(), DeliveryError> {
            panic!("sink exploded");
        }
    }

    #[test]
    fn panicking_subscriber_counts_as_dropped() {
        let registry = SubscriberRegistry::new();
        let handle: Arc<dyn AggregateSubscriber> = Arc::new(PanickingSubscriber);
        registry.register(&handle);

        assert_eq!(registry.notify(&sample()), PushOutcome::Dropped);
        assert!(registry.is_registered());
        // The lock is not poisoned by the panic
        assert_eq!(registry.notify(&sample()), PushOutcome::Dropped);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u8), "panicked");
    }
}
