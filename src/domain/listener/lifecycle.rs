//! Listener service lifecycle state machine

use std::fmt;
use thiserror::Error;

/// Service states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ServiceState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }

    /// Whether the host has started the service and not yet begun stopping it
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: ServiceState,
    pub action: String,
}

/// Service lifecycle entity.
///
/// State machine:
///   STOPPED -> STARTING (start)
///   STARTING -> RUNNING (mark_running, requires a platform connection)
///   RUNNING -> STARTING (disconnect)
///   STARTING | RUNNING -> STOPPING (begin_stop)
///   STOPPING -> STOPPED (finish_stop)
///
/// The platform connection is tracked separately: `connect` may arrive in
/// either live state and is what allows recomputation to run at all.
#[derive(Debug, Default)]
pub struct ServiceLifecycle {
    state: ServiceState,
    connected: bool,
}

impl ServiceLifecycle {
    /// Create a new lifecycle in stopped state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Whether the platform has granted a live connection
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether a recomputation may enumerate the platform right now
    pub fn can_recompute(&self) -> bool {
        self.state.is_live() && self.connected
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action: action.to_string(),
        }
    }

    /// Transition from STOPPED to STARTING
    pub fn start(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != ServiceState::Stopped {
            return Err(self.invalid("start"));
        }
        self.state = ServiceState::Starting;
        self.connected = false;
        Ok(())
    }

    /// Record that the platform connection is live
    pub fn connect(&mut self) -> Result<(), InvalidStateTransition> {
        if !self.state.is_live() {
            return Err(self.invalid("connect"));
        }
        self.connected = true;
        Ok(())
    }

    /// Transition from STARTING to RUNNING after the first successful recompute.
    ///
    /// Returns `Ok(false)` when already running.
    pub fn mark_running(&mut self) -> Result<bool, InvalidStateTransition> {
        match self.state {
            ServiceState::Running => Ok(false),
            ServiceState::Starting if self.connected => {
                self.state = ServiceState::Running;
                Ok(true)
            }
            _ => Err(self.invalid("mark running")),
        }
    }

    /// Drop the platform connection, falling back to STARTING
    pub fn disconnect(&mut self) -> Result<(), InvalidStateTransition> {
        if !self.state.is_live() {
            return Err(self.invalid("disconnect"));
        }
        self.state = ServiceState::Starting;
        self.connected = false;
        Ok(())
    }

    /// Transition from STARTING or RUNNING to STOPPING
    pub fn begin_stop(&mut self) -> Result<(), InvalidStateTransition> {
        if !self.state.is_live() {
            return Err(self.invalid("stop"));
        }
        self.state = ServiceState::Stopping;
        Ok(())
    }

    /// Transition from STOPPING to STOPPED
    pub fn finish_stop(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != ServiceState::Stopping {
            return Err(self.invalid("finish stopping"));
        }
        self.state = ServiceState::Stopped;
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lifecycle_is_stopped() {
        let lifecycle = ServiceLifecycle::new();
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
        assert!(!lifecycle.is_connected());
        assert!(!lifecycle.can_recompute());
    }

    #[test]
    fn start_from_stopped() {
        let mut lifecycle = ServiceLifecycle::new();
        assert!(lifecycle.start().is_ok());
        assert_eq!(lifecycle.state(), ServiceState::Starting);
    }

    #[test]
    fn start_twice_fails() {
        let mut lifecycle = ServiceLifecycle::new();
        lifecycle.start().unwrap();

        let err = lifecycle.start().unwrap_err();
        assert_eq!(err.current_state, ServiceState::Starting);
        assert!(err.action.contains("start"));
    }

    #[test]
    fn starting_without_connection_cannot_recompute() {
        let mut lifecycle = ServiceLifecycle::new();
        lifecycle.start().unwrap();
        assert!(!lifecycle.can_recompute());
    }

    #[test]
    fn mark_running_requires_connection() {
        let mut lifecycle = ServiceLifecycle::new();
        lifecycle.start().unwrap();

        let err = lifecycle.mark_running().unwrap_err();
        assert_eq!(err.current_state, ServiceState::Starting);

        lifecycle.connect().unwrap();
        assert!(lifecycle.can_recompute());
        assert!(lifecycle.mark_running().unwrap());
        assert_eq!(lifecycle.state(), ServiceState::Running);
        assert!(!lifecycle.mark_running().unwrap());
    }

    #[test]
    fn connect_while_stopped_fails() {
        let mut lifecycle = ServiceLifecycle::new();
        let err = lifecycle.connect().unwrap_err();
        assert_eq!(err.current_state, ServiceState::Stopped);
    }

    #[test]
    fn disconnect_falls_back_to_starting() {
        let mut lifecycle = ServiceLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.connect().unwrap();
        lifecycle.mark_running().unwrap();

        lifecycle.disconnect().unwrap();
        assert_eq!(lifecycle.state(), ServiceState::Starting);
        assert!(!lifecycle.is_connected());
    }

    #[test]
    fn stop_from_running() {
        let mut lifecycle = ServiceLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.connect().unwrap();
        lifecycle.mark_running().unwrap();

        lifecycle.begin_stop().unwrap();
        assert_eq!(lifecycle.state(), ServiceState::Stopping);
        assert!(!lifecycle.can_recompute());

        lifecycle.finish_stop().unwrap();
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
        assert!(!lifecycle.is_connected());
    }

    #[test]
    fn stop_from_stopped_fails() {
        let mut lifecycle = ServiceLifecycle::new();
        let err = lifecycle.begin_stop().unwrap_err();
        assert_eq!(err.current_state, ServiceState::Stopped);
    }

    #[test]
    fn finish_stop_requires_stopping() {
        let mut lifecycle = ServiceLifecycle::new();
        lifecycle.start().unwrap();
        let err = lifecycle.finish_stop().unwrap_err();
        assert_eq!(err.current_state, ServiceState::Starting);
    }

    #[test]
    fn full_cycle_can_restart() {
        let mut lifecycle = ServiceLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.connect().unwrap();
        lifecycle.mark_running().unwrap();
        lifecycle.begin_stop().unwrap();
        lifecycle.finish_stop().unwrap();

        lifecycle.start().unwrap();
        assert_eq!(lifecycle.state(), ServiceState::Starting);
        assert!(!lifecycle.is_connected());
    }

    #[test]
    fn state_display() {
        assert_eq!(ServiceState::Stopped.to_string(), "stopped");
        assert_eq!(ServiceState::Starting.to_string(), "starting");
        assert_eq!(ServiceState::Running.to_string(), "running");
        assert_eq!(ServiceState::Stopping.to_string(), "stopping");
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition {
            current_state: ServiceState::Stopping,
            action: "start".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("start"));
        assert!(msg.contains("stopping"));
    }
}
