//! OS signal handling for the daemon loop

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;

/// Requests delivered to the daemon loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSignal {
    /// Stop the aggregation service and start a fresh instance
    Restart,
    /// Stop everything and exit (SIGINT/SIGTERM or `daemon shutdown`)
    Shutdown,
}

/// Daemon signal handler
///
/// Turns SIGINT/SIGTERM into [`DaemonSignal::Shutdown`] and hands out a
/// sender so the socket server can feed the same loop.
pub struct DaemonSignalHandler {
    receiver: mpsc::Receiver<DaemonSignal>,
}

impl DaemonSignalHandler {
    /// Create the handler and start listening for shutdown signals
    pub async fn new() -> Result<(Self, mpsc::Sender<DaemonSignal>), std::io::Error> {
        let (tx, rx) = mpsc::channel(10);

        for (kind, name) in [
            (SignalKind::interrupt(), "SIGINT"),
            (SignalKind::terminate(), "SIGTERM"),
        ] {
            let tx = tx.clone();
            let mut stream = signal(kind)?;
            tokio::spawn(async move {
                if stream.recv().await.is_some() {
                    info!(signal = name, "received shutdown signal");
                    let _ = tx.send(DaemonSignal::Shutdown).await;
                }
            });
        }

        Ok((Self { receiver: rx }, tx))
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Option<DaemonSignal> {
        self.receiver.recv().await
    }
}
