//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::ipc::SocketPath;

/// BadgeTally - per-source notification counts from a background daemon
#[derive(Parser, Debug)]
#[command(name = "badge-tally")]
#[command(version)]
#[command(about = "Aggregate active notification counts per source and push updates to subscribers")]
#[command(long_about = None)]
pub struct Cli {
    /// Daemon socket path
    #[arg(long, global = true, value_name = "PATH", env = "BADGE_TALLY_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Log filter directive (e.g. badge_tally=debug)
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the aggregation daemon in the foreground
    Serve(ServeArgs),
    /// Send commands to the running daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `serve`
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Start without listener access; grant it later with `daemon grant`
    #[arg(long)]
    pub no_autoconnect: bool,

    /// PID file path
    #[arg(long, value_name = "PATH")]
    pub pid_file: Option<PathBuf>,
}

/// Daemon control actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DaemonAction {
    /// Show active notification counts per source
    Query {
        /// Print the raw JSON object
        #[arg(long)]
        json: bool,
    },
    /// Show the active notification count for one source
    Count {
        /// Source identifier (e.g. an application id)
        source: String,
    },
    /// Recompute counts from the platform now
    Refresh,
    /// Show the service state and listener connection
    Status,
    /// Stream count updates until interrupted
    Watch {
        /// Print raw JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Post a notification on the platform
    Post {
        /// Source identifier
        source: String,
        /// Notification id; posting an existing id replaces it
        item_id: String,
    },
    /// Dismiss a notification on the platform
    Dismiss {
        /// Notification id
        item_id: String,
    },
    /// Grant listener access to the aggregation service
    Grant,
    /// Revoke listener access from the aggregation service
    Revoke,
    /// Stop and start a fresh service instance
    Restart,
    /// Stop the daemon
    Shutdown,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Parsed daemon options
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub socket_path: SocketPath,
    pub pid_file: PathBuf,
    pub autoconnect: bool,
    pub broadcast_capacity: usize,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "log_level",
    "socket_path",
    "pid_file",
    "broadcast_capacity",
    "platform.autoconnect",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
