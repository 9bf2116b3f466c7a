//! Daemon command handler - sends commands to the running daemon via IPC

use crate::domain::aggregate::SourceId;

use super::args::DaemonAction;
use super::ipc::protocol::{parse_counts, parse_reply};
use super::ipc::{create_ipc_client, IpcClient, IpcCommand, SocketPath};
use super::presenter::Presenter;

/// Translate a CLI action into its wire command
pub fn to_command(action: &DaemonAction) -> Result<IpcCommand, String> {
    let source = |raw: &str| SourceId::new(raw).map_err(|e| e.to_string());

    Ok(match action {
        DaemonAction::Query { .. } => IpcCommand::Query,
        DaemonAction::Count { source: raw } => IpcCommand::Count(source(raw)?),
        DaemonAction::Refresh => IpcCommand::Refresh,
        DaemonAction::Status => IpcCommand::Status,
        DaemonAction::Watch { .. } => IpcCommand::Watch,
        DaemonAction::Post {
            source: raw,
            item_id,
        } => IpcCommand::Post {
            source: source(raw)?,
            item_id: single_word(item_id)?,
        },
        DaemonAction::Dismiss { item_id } => IpcCommand::Dismiss {
            item_id: single_word(item_id)?,
        },
        DaemonAction::Grant => IpcCommand::Grant,
        DaemonAction::Revoke => IpcCommand::Revoke,
        DaemonAction::Restart => IpcCommand::Restart,
        DaemonAction::Shutdown => IpcCommand::Shutdown,
    })
}

fn single_word(item_id: &str) -> Result<String, String> {
    if item_id.is_empty() || item_id.chars().any(char::is_whitespace) {
        return Err(format!(
            "invalid item id '{}': must be non-empty without whitespace",
            item_id
        ));
    }
    Ok(item_id.to_string())
}

/// Handle daemon subcommand
pub async fn handle_daemon_command(
    action: DaemonAction,
    socket_path: SocketPath,
    presenter: &Presenter,
) -> Result<(), String> {
    let command = to_command(&action)?;
    let client = create_ipc_client(socket_path);

    if !client.is_daemon_running() {
        return Err("No daemon running. Start with: badge-tally serve".to_string());
    }

    if let DaemonAction::Watch { json } = action {
        return watch(client.as_ref(), &command, json, presenter).await;
    }

    let response = client
        .send_command(&command)
        .await
        .map_err(|e| format!("Failed to communicate with daemon: {}", e))?;
    let value = parse_reply(&response)?;

    match action {
        DaemonAction::Query { json: true } => presenter.output(value),
        DaemonAction::Query { json: false } => {
            let counts = parse_counts(value).map_err(|e| e.to_string())?;
            presenter.counts(&counts);
        }
        DaemonAction::Count { .. } => presenter.output(value),
        DaemonAction::Status => presenter.output(value),
        _ => presenter.success(&format!("Command sent: {}", command)),
    }

    Ok(())
}

async fn watch(
    client: &dyn IpcClient,
    command: &IpcCommand,
    json: bool,
    presenter: &Presenter,
) -> Result<(), String> {
    let mut lines = client
        .open_stream(command)
        .await
        .map_err(|e| format!("Failed to communicate with daemon: {}", e))?;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    presenter.info("Daemon closed the stream");
                    return Ok(());
                };
                let value = parse_reply(&line)?;
                if json {
                    presenter.output(value);
                } else {
                    let counts = parse_counts(value).map_err(|e| e.to_string())?;
                    presenter.counts(&counts);
                    presenter.output("");
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_wire_commands() {
        assert_eq!(
            to_command(&DaemonAction::Query { json: true }).unwrap(),
            IpcCommand::Query
        );
        assert_eq!(
            to_command(&DaemonAction::Count {
                source: "chat".to_string()
            })
            .unwrap()
            .to_string(),
            "count chat"
        );
        assert_eq!(
            to_command(&DaemonAction::Post {
                source: "chat".to_string(),
                item_id: "7".to_string()
            })
            .unwrap()
            .to_string(),
            "post chat 7"
        );
    }

    #[test]
    fn blank_source_is_rejected_before_sending() {
        assert!(to_command(&DaemonAction::Count {
            source: "  ".to_string()
        })
        .is_err());
    }

    #[test]
    fn item_ids_with_spaces_are_rejected() {
        assert!(to_command(&DaemonAction::Dismiss {
            item_id: "a b".to_string()
        })
        .is_err());
    }

    #[tokio::test]
    async fn missing_socket_reports_no_daemon() {
        let dir = tempfile::TempDir::new().unwrap();
        let socket = SocketPath::from_path(dir.path().join("absent.sock"));
        let err = handle_daemon_command(DaemonAction::Status, socket, &Presenter::new())
            .await
            .unwrap_err();
        assert!(err.contains("No daemon running"));
    }
}
