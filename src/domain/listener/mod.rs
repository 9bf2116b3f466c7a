//! Listener lifecycle domain

mod event;
mod lifecycle;

pub use event::LifecycleEvent;
pub use lifecycle::{InvalidStateTransition, ServiceLifecycle, ServiceState};
