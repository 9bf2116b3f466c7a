//! Daemon app runner
//!
//! Hosts the in-memory platform and the aggregation service, and serves
//! consumer commands over the daemon socket.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::application::ports::{AggregateSubscriber, LifecycleListener};
use crate::application::{AggregationBridge, NotificationAggregationService, ServiceSlot};
use crate::domain::aggregate::AggregateSnapshot;
use crate::domain::listener::InvalidStateTransition;
use crate::infrastructure::{BroadcastSubscriber, InMemoryPlatform};

use super::app::{EXIT_ERROR, EXIT_SUCCESS};
use super::args::DaemonOptions;
use super::ipc::{create_ipc_server, CommandHandler, IpcCommand, IpcReply};
use super::pid_file::PidFile;
use super::presenter::Presenter;
use super::signals::{DaemonSignal, DaemonSignalHandler};

/// Errors bringing a service instance up
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Lifecycle(#[from] InvalidStateTransition),

    #[error("failed to bind platform listener: {0}")]
    Bind(#[from] io::Error),
}

/// Owns the running service instance and its platform binding
pub struct ListenerHost {
    platform: Arc<InMemoryPlatform>,
    slot: ServiceSlot,
    service: Option<Arc<NotificationAggregationService>>,
}

impl ListenerHost {
    pub fn new(platform: Arc<InMemoryPlatform>, slot: ServiceSlot) -> Self {
        Self {
            platform,
            slot,
            service: None,
        }
    }

    /// Create, publish and bind a fresh service instance
    pub fn start(&mut self) -> Result<(), HostError> {
        self.stop();

        let service = Arc::new(NotificationAggregationService::new(self.platform.clone()));
        service.start(&self.slot)?;

        let listener: Arc<dyn LifecycleListener> = service.clone();
        if let Err(e) = self.platform.bind_listener(Arc::downgrade(&listener)) {
            let _ = service.stop(&self.slot);
            return Err(e.into());
        }

        self.service = Some(service);
        Ok(())
    }

    /// Unbind and stop the current instance, if any
    pub fn stop(&mut self) {
        let Some(service) = self.service.take() else {
            return;
        };
        self.platform.unbind_listener();
        if let Err(e) = service.stop(&self.slot) {
            warn!(error = %e, "service was not running");
        }
    }

    /// Replace the running instance with a new one
    pub fn restart(&mut self) -> Result<(), HostError> {
        self.stop();
        self.start()
    }

    /// The running instance, if any
    pub fn service(&self) -> Option<&Arc<NotificationAggregationService>> {
        self.service.as_ref()
    }
}

impl Drop for ListenerHost {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Executes socket commands against the bridge and the platform
pub struct DaemonCommands {
    platform: Arc<InMemoryPlatform>,
    bridge: AggregationBridge,
    updates: Arc<BroadcastSubscriber>,
}

impl DaemonCommands {
    pub fn new(
        platform: Arc<InMemoryPlatform>,
        slot: ServiceSlot,
        updates: Arc<BroadcastSubscriber>,
    ) -> Self {
        let subscriber: Arc<dyn AggregateSubscriber> = updates.clone();
        Self {
            platform,
            bridge: AggregationBridge::new(slot, subscriber),
            updates,
        }
    }

    /// Register the push subscriber with the current service instance
    pub fn attach(&self) -> bool {
        self.bridge.attach()
    }
}

impl CommandHandler for DaemonCommands {
    fn handle(&self, command: IpcCommand) -> IpcReply {
        match command {
            IpcCommand::Query => IpcReply::Snapshot(self.bridge.query()),
            IpcCommand::Count(source) => {
                IpcReply::Value(self.bridge.count_for(source.as_str()).to_string())
            }
            IpcCommand::Refresh => {
                self.bridge.refresh();
                IpcReply::Ok
            }
            IpcCommand::Status => IpcReply::Value(format!(
                "{} connected={}",
                self.bridge.status(),
                self.bridge.is_listener_connected()
            )),
            IpcCommand::Post { source, item_id } => {
                self.platform.post(source, item_id);
                IpcReply::Ok
            }
            IpcCommand::Dismiss { item_id } => match self.platform.dismiss(&item_id) {
                Some(_) => IpcReply::Ok,
                None => IpcReply::Error(format!("unknown item {}", item_id)),
            },
            IpcCommand::Grant => {
                self.platform.grant_access();
                IpcReply::Ok
            }
            IpcCommand::Revoke => {
                self.platform.revoke_access();
                IpcReply::Ok
            }
            IpcCommand::Watch | IpcCommand::Restart | IpcCommand::Shutdown => {
                IpcReply::Error(format!("'{}' is handled by the server", command))
            }
        }
    }

    fn watch(&self) -> (AggregateSnapshot, broadcast::Receiver<AggregateSnapshot>) {
        let receiver = self.updates.subscribe();
        (self.bridge.query(), receiver)
    }
}

/// Run daemon mode
pub async fn run_daemon(options: DaemonOptions) -> ExitCode {
    let presenter = Presenter::new();

    let mut pid_file = PidFile::with_path(&options.pid_file);
    if let Err(e) = pid_file.acquire() {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    let (mut signals, signal_tx) = match DaemonSignalHandler::new().await {
        Ok(s) => s,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let platform = Arc::new(InMemoryPlatform::new());
    let slot = ServiceSlot::global();
    let mut host = ListenerHost::new(platform.clone(), slot.clone());
    if let Err(e) = host.start() {
        presenter.error(&format!("Failed to start aggregation service: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let updates = Arc::new(BroadcastSubscriber::new(options.broadcast_capacity));
    let commands = Arc::new(DaemonCommands::new(platform.clone(), slot, updates));

    let mut server = create_ipc_server(options.socket_path.clone());
    if let Err(e) = server.bind() {
        presenter.error(&format!("Failed to bind socket: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let handler: Arc<dyn CommandHandler> = commands.clone();
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run(signal_tx, handler).await {
            error!(error = %e, "socket server stopped");
        }
    });

    if options.autoconnect {
        platform.grant_access();
    } else {
        presenter.warn("Listener access not granted. Run: badge-tally daemon grant");
    }

    presenter.daemon_status("Started, waiting for commands...");
    presenter.info(&format!(
        "PID: {} | Socket: {} | SIGINT: exit",
        std::process::id(),
        options.socket_path.path().display()
    ));

    let code = loop {
        match signals.recv().await {
            Some(DaemonSignal::Restart) => {
                info!("restarting aggregation service");
                match host.restart() {
                    Ok(()) => {
                        commands.attach();
                        presenter.daemon_status("Restarted");
                    }
                    Err(e) => {
                        presenter.error(&format!("Restart failed: {}", e));
                        break EXIT_ERROR;
                    }
                }
            }
            Some(DaemonSignal::Shutdown) | None => break EXIT_SUCCESS,
        }
    };

    host.stop();

    // The server is dropped with its task, which removes the socket file
    server_task.abort();
    let _ = server_task.await;

    if let Err(e) = pid_file.release() {
        presenter.warn(&e.to_string());
    }

    presenter.daemon_status("Stopped");
    ExitCode::from(code)
}
