//! Shared plumbing for CLI entry points: exit codes, config merging, logging

use std::env;

use tracing_subscriber::{fmt, EnvFilter};

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::infrastructure::XdgConfigStore;

use super::args::{DaemonOptions, ServeArgs};
use super::ipc::SocketPath;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment variable overriding `log_level`
pub const LOG_LEVEL_ENV: &str = "BADGE_TALLY_LOG";

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load_or_empty().await;

    let env_config = AppConfig {
        log_level: env::var(LOG_LEVEL_ENV).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured directive. Output goes to stderr so
/// stdout stays clean for command results.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new(crate::domain::config::DEFAULT_LOG_LEVEL));

    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Resolve the daemon socket from merged config
pub fn socket_path(config: &AppConfig) -> SocketPath {
    config
        .socket_path()
        .map(SocketPath::from_path)
        .unwrap_or_default()
}

/// Build daemon options from merged config and `serve` flags
pub fn daemon_options(config: &AppConfig, args: &ServeArgs) -> DaemonOptions {
    DaemonOptions {
        socket_path: socket_path(config),
        pid_file: args
            .pid_file
            .clone()
            .unwrap_or_else(|| config.pid_file_or_default()),
        autoconnect: config.autoconnect_or_default() && !args.no_autoconnect,
        broadcast_capacity: config.broadcast_capacity_or_default(),
    }
}
