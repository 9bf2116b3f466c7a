//! Platform ports: active item enumeration and lifecycle callbacks

use thiserror::Error;

use crate::domain::aggregate::ActiveItem;
use crate::domain::listener::LifecycleEvent;

/// Enumeration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerationError {
    #[error("Listener access has not been granted")]
    AccessDenied,

    #[error("Platform enumeration failed: {0}")]
    Unavailable(String),
}

/// Port for reading the platform's ground truth.
///
/// Called synchronously from whatever thread triggers a recompute; the call
/// may block briefly on platform IPC.
pub trait ActiveItemSource: Send + Sync {
    /// List every item currently active on the platform.
    ///
    /// # Returns
    /// All active items, in no particular order, or an error if the platform
    /// could not be queried
    fn enumerate_active_items(&self) -> Result<Vec<ActiveItem>, EnumerationError>;
}

/// Port the platform calls into on every lifecycle callback.
///
/// Implementations must not panic or block indefinitely: a failure inside a
/// platform callback takes the whole listener down.
pub trait LifecycleListener: Send + Sync {
    fn on_lifecycle_event(&self, event: LifecycleEvent);
}
