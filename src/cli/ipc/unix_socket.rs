//! Unix Domain Socket transport for daemon control

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::protocol::{snapshot_line, IpcCommand, IpcReply};
use super::{CommandHandler, IpcClient, IpcServer};
use crate::cli::signals::DaemonSignal;

const SOCKET_NAME: &str = "badge-tally.sock";

/// Socket path resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketPath {
    path: PathBuf,
}

impl SocketPath {
    /// Default socket path, preferring XDG_RUNTIME_DIR
    pub fn new() -> Self {
        let path = std::env::var("XDG_RUNTIME_DIR")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(|dir| PathBuf::from(dir).join(SOCKET_NAME))
            .unwrap_or_else(|| std::env::temp_dir().join(SOCKET_NAME));
        Self { path }
    }

    /// Use an explicit socket path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if socket file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove socket file if it exists
    pub fn cleanup(&self) -> io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for SocketPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Unix Domain Socket server for daemon commands
pub struct UnixSocketServer {
    socket_path: SocketPath,
    listener: Option<UnixListener>,
}

impl UnixSocketServer {
    /// Create a new socket server
    pub fn new(socket_path: SocketPath) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }
}

impl Drop for UnixSocketServer {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.cleanup();
        }
    }
}

#[async_trait]
impl IpcServer for UnixSocketServer {
    fn bind(&mut self) -> io::Result<()> {
        // Remove stale socket file if it exists
        self.socket_path.cleanup()?;

        let listener = UnixListener::bind(self.socket_path.path())?;
        self.listener = Some(listener);
        Ok(())
    }

    fn path(&self) -> String {
        self.socket_path.path().to_string_lossy().to_string()
    }

    async fn run(
        &self,
        tx: mpsc::Sender<DaemonSignal>,
        handler: Arc<dyn CommandHandler>,
    ) -> io::Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket not bound"))?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let tx = tx.clone();
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, tx, handler).await {
                            debug!(error = %e, "socket connection error");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "socket accept error");
                }
            }
        }
    }

    fn cleanup(&self) {
        let _ = self.socket_path.cleanup();
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: UnixStream,
    tx: mpsc::Sender<DaemonSignal>,
    handler: Arc<dyn CommandHandler>,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader.read_line(&mut line).await?;

    let command = match line.parse::<IpcCommand>() {
        Ok(command) => command,
        Err(e) => {
            return write_line(&mut writer, &IpcReply::Error(e.to_string()).to_line()).await;
        }
    };
    debug!(%command, "ipc command");

    let reply = match command {
        IpcCommand::Watch => return stream_updates(reader, writer, handler).await,
        IpcCommand::Restart => forward(&tx, DaemonSignal::Restart).await,
        IpcCommand::Shutdown => forward(&tx, DaemonSignal::Shutdown).await,
        other => tokio::task::spawn_blocking(move || handler.handle(other))
            .await
            .unwrap_or_else(|e| IpcReply::Error(format!("command failed: {}", e))),
    };

    write_line(&mut writer, &reply.to_line()).await
}

async fn forward(tx: &mpsc::Sender<DaemonSignal>, signal: DaemonSignal) -> IpcReply {
    match tx.send(signal).await {
        Ok(()) => IpcReply::Ok,
        Err(_) => IpcReply::Error("daemon is shutting down".to_string()),
    }
}

/// Serve `watch`: the current counts, then one line per push until either
/// side goes away
async fn stream_updates(
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    handler: Arc<dyn CommandHandler>,
) -> io::Result<()> {
    let (current, mut updates) = handler.watch();
    write_line(&mut writer, &snapshot_line(&current)).await?;

    let mut discard = String::new();
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => write_line(&mut writer, &snapshot_line(&snapshot)).await?,
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "watch client lagging"),
                Err(RecvError::Closed) => return Ok(()),
            },
            read = reader.read_line(&mut discard) => {
                if read? == 0 {
                    return Ok(());
                }
                discard.clear();
            }
        }
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Unix Domain Socket client for sending commands to daemon
pub struct UnixSocketClient {
    socket_path: SocketPath,
}

impl UnixSocketClient {
    /// Create a new socket client
    pub fn new(socket_path: SocketPath) -> Self {
        Self { socket_path }
    }
}

#[async_trait]
impl IpcClient for UnixSocketClient {
    fn is_daemon_running(&self) -> bool {
        self.socket_path.exists()
    }

    async fn send_command(&self, command: &IpcCommand) -> io::Result<String> {
        let stream = UnixStream::connect(self.socket_path.path()).await?;
        let (reader, mut writer) = stream.into_split();

        write_line(&mut writer, &command.to_string()).await?;

        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        reader.read_line(&mut response).await?;

        Ok(response)
    }

    async fn open_stream(&self, command: &IpcCommand) -> io::Result<mpsc::Receiver<String>> {
        let stream = UnixStream::connect(self.socket_path.path()).await?;
        let (reader, mut writer) = stream.into_split();

        write_line(&mut writer, &command.to_string()).await?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            // Dropping the write half would signal EOF and end the stream
            let _writer = writer;
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregate::{ActiveItem, AggregateSnapshot, SourceId};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::broadcast;

    struct StaticHandler {
        snapshot: AggregateSnapshot,
        updates: broadcast::Sender<AggregateSnapshot>,
    }

    impl StaticHandler {
        fn new() -> Self {
            let item = ActiveItem::new(SourceId::new("chat").unwrap(), "1");
            let (updates, _) = broadcast::channel(4);
            Self {
                snapshot: AggregateSnapshot::from_items(&[item]),
                updates,
            }
        }
    }

    impl CommandHandler for StaticHandler {
        fn handle(&self, command: IpcCommand) -> IpcReply {
            match command {
                IpcCommand::Query => IpcReply::Snapshot(self.snapshot.clone()),
                IpcCommand::Count(source) => {
                    IpcReply::Value(self.snapshot.count_for(source.as_str()).to_string())
                }
                _ => IpcReply::Error("unsupported".to_string()),
            }
        }

        fn watch(&self) -> (AggregateSnapshot, broadcast::Receiver<AggregateSnapshot>) {
            let rx = self.updates.subscribe();
            (self.snapshot.clone(), rx)
        }
    }

    struct Harness {
        _dir: TempDir,
        client: UnixSocketClient,
        signals: mpsc::Receiver<DaemonSignal>,
        handler: Arc<StaticHandler>,
        server: tokio::task::JoinHandle<()>,
    }

    async fn start_server() -> Harness {
        let dir = TempDir::new().unwrap();
        let path = SocketPath::from_path(dir.path().join("test.sock"));
        let mut server = UnixSocketServer::new(path.clone());
        server.bind().unwrap();

        let (tx, signals) = mpsc::channel(4);
        let handler = Arc::new(StaticHandler::new());
        let dyn_handler: Arc<dyn CommandHandler> = handler.clone();
        let server = tokio::spawn(async move {
            let _ = server.run(tx, dyn_handler).await;
        });

        Harness {
            _dir: dir,
            client: UnixSocketClient::new(path),
            signals,
            handler,
            server,
        }
    }

    #[test]
    fn socket_path_uses_xdg_runtime_dir() {
        let expected = std::env::var("XDG_RUNTIME_DIR")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(|dir| PathBuf::from(dir).join(SOCKET_NAME))
            .unwrap_or_else(|| std::env::temp_dir().join(SOCKET_NAME));

        assert_eq!(SocketPath::new().path(), expected.as_path());
    }

    #[test]
    fn explicit_socket_path() {
        let path = SocketPath::from_path("/run/custom.sock");
        assert_eq!(path.path(), Path::new("/run/custom.sock"));
    }

    #[tokio::test]
    async fn request_reply_round_trip() {
        let harness = start_server().await;
        assert!(harness.client.is_daemon_running());

        let reply = harness.client.send_command(&IpcCommand::Query).await.unwrap();
        assert_eq!(reply.trim(), r#"{"chat":1}"#);

        let count = IpcCommand::Count(SourceId::new("mail").unwrap());
        let reply = harness.client.send_command(&count).await.unwrap();
        assert_eq!(reply.trim(), "0");

        harness.server.abort();
    }

    #[tokio::test]
    async fn lifecycle_commands_reach_the_daemon_loop() {
        let mut harness = start_server().await;

        let reply = harness.client.send_command(&IpcCommand::Restart).await.unwrap();
        assert_eq!(reply.trim(), "ok");
        assert_eq!(harness.signals.recv().await, Some(DaemonSignal::Restart));

        let reply = harness.client.send_command(&IpcCommand::Shutdown).await.unwrap();
        assert_eq!(reply.trim(), "ok");
        assert_eq!(harness.signals.recv().await, Some(DaemonSignal::Shutdown));

        harness.server.abort();
    }

    #[tokio::test]
    async fn unknown_command_gets_error_reply() {
        let harness = start_server().await;

        let stream = UnixStream::connect(harness.client.socket_path.path())
            .await
            .unwrap();
        let (reader, mut writer) = stream.into_split();
        write_line(&mut writer, "toggle").await.unwrap();
        let mut reply = String::new();
        BufReader::new(reader).read_line(&mut reply).await.unwrap();

        assert!(reply.starts_with("error: unknown command"));
        harness.server.abort();
    }

    #[tokio::test]
    async fn watch_streams_current_then_pushes() {
        let harness = start_server().await;
        let mut lines = harness.client.open_stream(&IpcCommand::Watch).await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), lines.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, r#"{"chat":1}"#);

        // The server has subscribed once the first line arrives
        harness.handler.updates.send(AggregateSnapshot::empty()).unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), lines.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, "{}");

        harness.server.abort();
    }

    #[tokio::test]
    async fn dropped_server_removes_socket_file() {
        let dir = TempDir::new().unwrap();
        let path = SocketPath::from_path(dir.path().join("gone.sock"));
        let mut server = UnixSocketServer::new(path.clone());
        server.bind().unwrap();
        assert!(path.exists());

        drop(server);
        assert!(!path.exists());
    }
}
