//! Notification platform adapters

mod memory;

pub use memory::InMemoryPlatform;
