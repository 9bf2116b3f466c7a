//! Aggregate value objects

mod snapshot;
mod source;

pub use snapshot::AggregateSnapshot;
pub use source::{ActiveItem, InvalidSourceId, SourceId};
