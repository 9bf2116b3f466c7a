//! Push subscriber port

use thiserror::Error;

use crate::domain::aggregate::AggregateSnapshot;

/// Delivery errors. Never surfaced past the subscriber registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Subscriber is not connected to its downstream sink")]
    Disconnected,

    /// The subscriber panicked or its sink errored
    #[error("Failed to deliver aggregate: {0}")]
    Failed(String),
}

/// Port for the single downstream recipient of aggregate pushes.
///
/// Called synchronously from the recompute path while the registry lock is
/// held, so implementations must hand the snapshot off without blocking and
/// must not call back into the service's recompute.
pub trait AggregateSubscriber: Send + Sync {
    /// Receive a freshly recomputed aggregate.
    ///
    /// # Returns
    /// Ok(()) when handed to the downstream sink, `DeliveryError::Disconnected`
    /// when the sink is currently absent
    fn on_aggregate_changed(&self, snapshot: &AggregateSnapshot) -> Result<(), DeliveryError>;
}
