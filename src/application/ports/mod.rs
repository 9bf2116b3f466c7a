//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the aggregation core
//! and the platform, subscriber, and storage adapters.

pub mod config;
pub mod item_source;
pub mod subscriber;

// Re-export common types
pub use config::ConfigStore;
pub use item_source::{ActiveItemSource, EnumerationError, LifecycleListener};
pub use subscriber::{AggregateSubscriber, DeliveryError};
