//! Platform lifecycle events

use std::fmt;

use crate::domain::aggregate::ActiveItem;

/// Callback delivered by the notification platform.
///
/// Delivery is neither ordered nor exactly-once; the payload of `Posted` and
/// `Removed` is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Posted(ActiveItem),
    Removed(ActiveItem),
    /// The platform granted (or re-granted) the listener connection
    Connected,
    /// The platform revoked the listener connection
    Disconnected,
}

impl LifecycleEvent {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Posted(_) => "posted",
            Self::Removed(_) => "removed",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posted(item) | Self::Removed(item) => {
                write!(f, "{} {}/{}", self.kind(), item.source, item.item_id)
            }
            _ => f.write_str(self.kind()),
        }
    }
}
