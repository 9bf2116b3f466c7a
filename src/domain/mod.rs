//! Domain layer - Core value objects and state machines
//!
//! Contains the aggregate snapshot, listener lifecycle, configuration,
//! and domain errors. This layer has no dependencies on external systems.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod listener;

// Re-export common types
pub use aggregate::{ActiveItem, AggregateSnapshot, InvalidSourceId, SourceId};
pub use config::AppConfig;
pub use error::*;
pub use listener::{InvalidStateTransition, LifecycleEvent, ServiceLifecycle, ServiceState};
