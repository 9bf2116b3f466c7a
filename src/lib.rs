//! BadgeTally - per-source notification counts with push updates
//!
//! A background service listens for notification lifecycle callbacks from
//! the platform, re-enumerates every active notification on each callback,
//! and publishes a per-source count map. Consumers read the latest map on
//! demand or receive pushes whenever it is recomputed.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Source ids, aggregate snapshots, the listener lifecycle, config
//! - **Application**: Aggregation service, store, subscriber registry, the
//!   process-wide service slot, the consumer bridge, and port traits
//! - **Infrastructure**: In-memory notification platform, broadcast push
//!   subscriber, XDG config storage
//! - **CLI**: Daemon host, socket protocol, client commands, signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
