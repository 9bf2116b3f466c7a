//! Aggregate subscriber adapters

mod broadcast;

pub use broadcast::BroadcastSubscriber;
