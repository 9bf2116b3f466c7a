//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default tracing filter directive
pub const DEFAULT_LOG_LEVEL: &str = "badge_tally=info";

/// Default capacity of the push channel feeding `watch` clients
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Platform adapter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Grant listener access as soon as the daemon starts
    pub autoconnect: Option<bool>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub log_level: Option<String>,
    pub socket_path: Option<String>,
    pub pid_file: Option<String>,
    pub broadcast_capacity: Option<usize>,
    pub platform: Option<PlatformConfig>,
}

impl AppConfig {
    /// Create config with default values.
    ///
    /// Socket and PID file paths are environment dependent and are
    /// resolved at runtime when left unset.
    pub fn defaults() -> Self {
        Self {
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            socket_path: None,
            pid_file: None,
            broadcast_capacity: Some(DEFAULT_BROADCAST_CAPACITY),
            platform: Some(PlatformConfig {
                autoconnect: Some(true),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            log_level: other.log_level.or(self.log_level),
            socket_path: other.socket_path.or(self.socket_path),
            pid_file: other.pid_file.or(self.pid_file),
            broadcast_capacity: other.broadcast_capacity.or(self.broadcast_capacity),
            platform: Self::merge_platform_config(self.platform, other.platform),
        }
    }

    fn merge_platform_config(
        base: Option<PlatformConfig>,
        other: Option<PlatformConfig>,
    ) -> Option<PlatformConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(PlatformConfig {
                autoconnect: o.autoconnect.or(b.autoconnect),
            }),
        }
    }

    /// Get the tracing filter directive, or the default if not set
    pub fn log_level_or_default(&self) -> &str {
        self.log_level
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Get the configured socket path, if any
    pub fn socket_path(&self) -> Option<PathBuf> {
        self.socket_path
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// Get the configured PID file path, or `<tmp>/badge-tally.pid`
    pub fn pid_file_or_default(&self) -> PathBuf {
        self.pid_file
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("badge-tally.pid"))
    }

    /// Get the push channel capacity, never less than 1
    pub fn broadcast_capacity_or_default(&self) -> usize {
        self.broadcast_capacity
            .unwrap_or(DEFAULT_BROADCAST_CAPACITY)
            .max(1)
    }

    /// Get autoconnect setting, or true if not set
    pub fn autoconnect_or_default(&self) -> bool {
        self.platform
            .as_ref()
            .and_then(|p| p.autoconnect)
            .unwrap_or(true)
    }
}
