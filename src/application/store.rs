//! Aggregate store - the single mutable shared resource

use std::sync::RwLock;

use crate::domain::aggregate::AggregateSnapshot;

/// Holds the current aggregate snapshot.
///
/// `replace` swaps the whole snapshot under the write lock and `read` hands out
/// a clone of the immutable snapshot, so readers see either the old or the new
/// mapping, never a mix.
#[derive(Debug, Default)]
pub struct AggregateStore {
    current: RwLock<AggregateSnapshot>,
}

impl AggregateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new snapshot, returning the one it replaced
    pub fn replace(&self, snapshot: AggregateSnapshot) -> AggregateSnapshot {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, snapshot)
    }

    /// Get the current snapshot
    pub fn read(&self) -> AggregateSnapshot {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Drop back to an empty snapshot
    pub fn reset(&self) {
        self.replace(AggregateSnapshot::empty());
    }
}
