//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces: the in-memory
//! notification platform, the broadcast push subscriber, and config storage.

pub mod config;
pub mod platform;
pub mod subscriber;

// Re-export adapters
pub use config::XdgConfigStore;
pub use platform::InMemoryPlatform;
pub use subscriber::BroadcastSubscriber;
