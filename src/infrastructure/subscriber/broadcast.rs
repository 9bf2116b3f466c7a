//! Broadcast-channel subscriber adapter
//!
//! Fans aggregate pushes out to any number of async receivers (IPC `watch`
//! clients). With no receivers attached the subscriber counts as disconnected
//! and pushes are dropped; late receivers start from the next push.

use tokio::sync::broadcast;

use crate::application::ports::{AggregateSubscriber, DeliveryError};
use crate::domain::aggregate::AggregateSnapshot;
use crate::domain::config::DEFAULT_BROADCAST_CAPACITY;

/// Subscriber that forwards snapshots into a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastSubscriber {
    sender: broadcast::Sender<AggregateSnapshot>,
}

impl BroadcastSubscriber {
    /// Create a subscriber buffering up to `capacity` snapshots per receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a new receiver
    pub fn subscribe(&self) -> broadcast::Receiver<AggregateSnapshot> {
        self.sender.subscribe()
    }

    /// Number of attached receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSubscriber {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl AggregateSubscriber for BroadcastSubscriber {
    fn on_aggregate_changed(&self, snapshot: &AggregateSnapshot) -> Result<(), DeliveryError> {
        self.sender
            .send(snapshot.clone())
            .map(|_| ())
            .map_err(|_| DeliveryError::Disconnected)
    }
}
