//! IPC (Inter-Process Communication) for daemon control
//!
//! The daemon listens on a Unix domain socket and speaks the line
//! protocol defined in [`protocol`].

pub mod protocol;
mod unix_socket;

pub use protocol::{IpcCommand, IpcReply, ProtocolError};
pub use unix_socket::{SocketPath, UnixSocketClient, UnixSocketServer};

use std::io;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use super::signals::DaemonSignal;
use crate::domain::aggregate::AggregateSnapshot;

/// Executes daemon commands on behalf of the IPC server.
///
/// `restart`, `shutdown` and `watch` never reach [`CommandHandler::handle`]:
/// the server routes the first two to the daemon loop and serves `watch`
/// from [`CommandHandler::watch`].
pub trait CommandHandler: Send + Sync + 'static {
    /// Execute a single request/reply command. May block briefly.
    fn handle(&self, command: IpcCommand) -> IpcReply;

    /// Current counts plus a receiver for every later push.
    ///
    /// The receiver is subscribed before the snapshot is read so no
    /// update falls between the two.
    fn watch(&self) -> (AggregateSnapshot, broadcast::Receiver<AggregateSnapshot>);
}

/// Trait for IPC servers that listen for daemon commands
#[async_trait::async_trait]
pub trait IpcServer: Send + Sync {
    /// Bind to the IPC endpoint
    fn bind(&mut self) -> io::Result<()>;

    /// Get the path/name of the IPC endpoint
    fn path(&self) -> String;

    /// Accept and handle connections until the task is cancelled.
    ///
    /// Lifecycle commands are forwarded to `tx`; everything else goes to
    /// `handler`.
    async fn run(
        &self,
        tx: mpsc::Sender<DaemonSignal>,
        handler: Arc<dyn CommandHandler>,
    ) -> io::Result<()>;

    /// Cleanup IPC resources
    fn cleanup(&self);
}

/// Trait for IPC clients that send commands to the daemon
#[async_trait::async_trait]
pub trait IpcClient: Send + Sync {
    /// Check if daemon appears to be running (endpoint exists)
    fn is_daemon_running(&self) -> bool;

    /// Send a command and receive the single reply line
    async fn send_command(&self, command: &IpcCommand) -> io::Result<String>;

    /// Send a streaming command and receive reply lines until the daemon
    /// closes the connection or the receiver is dropped
    async fn open_stream(&self, command: &IpcCommand) -> io::Result<mpsc::Receiver<String>>;
}

/// Create the IPC server for `path`
pub fn create_ipc_server(path: SocketPath) -> Box<dyn IpcServer> {
    Box::new(UnixSocketServer::new(path))
}

/// Create the IPC client for `path`
pub fn create_ipc_client(path: SocketPath) -> Box<dyn IpcClient> {
    Box::new(UnixSocketClient::new(path))
}
