//! Application layer - The aggregation core and its port interfaces
//!
//! Contains the aggregate store, the subscriber registry, the listener
//! service, the process-wide service handle, and the consumer bridge.

pub mod bridge;
pub mod handle;
pub mod ports;
pub mod registry;
pub mod service;
pub mod store;

pub use bridge::AggregationBridge;
pub use handle::ServiceSlot;
pub use registry::{PushOutcome, SubscriberRegistry};
pub use service::NotificationAggregationService;
pub use store::AggregateStore;
