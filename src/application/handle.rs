//! Process-wide service handle
//!
//! The external host publishes the service when it starts the listener and
//! clears it on stop. Every other component only reads the handle and must
//! cope with it being empty.

use std::sync::{Arc, OnceLock, RwLock};

use super::service::NotificationAggregationService;

static GLOBAL_SLOT: OnceLock<ServiceSlot> = OnceLock::new();

/// Shared holder for the live service instance.
///
/// Clones refer to the same slot.
#[derive(Debug, Clone, Default)]
pub struct ServiceSlot {
    current: Arc<RwLock<Option<Arc<NotificationAggregationService>>>>,
}

impl ServiceSlot {
    /// Create a private, empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide slot
    pub fn global() -> Self {
        GLOBAL_SLOT.get_or_init(ServiceSlot::new).clone()
    }

    /// Publish an instance, returning the one it displaced
    pub fn publish(
        &self,
        service: Arc<NotificationAggregationService>,
    ) -> Option<Arc<NotificationAggregationService>> {
        self.current
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(service)
    }

    /// Remove whatever instance is published
    pub fn clear(&self) -> Option<Arc<NotificationAggregationService>> {
        self.current.write().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Remove the published instance only if it is `service`.
    ///
    /// Returns true if it was removed.
    pub fn clear_if(&self, service: &NotificationAggregationService) -> bool {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let is_current = guard
            .as_ref()
            .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), service));
        if is_current {
            guard.take();
        }
        is_current
    }

    /// The published instance, if the service is currently running
    pub fn get(&self) -> Option<Arc<NotificationAggregationService>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether an instance is currently published
    pub fn is_occupied(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
