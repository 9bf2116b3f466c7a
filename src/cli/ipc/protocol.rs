//! Line protocol spoken over the daemon socket
//!
//! One command per connection, newline terminated. Replies are a single
//! line: `ok`, a plain value, a JSON object of counts, or `error: <reason>`.
//! `watch` keeps the connection open and streams one JSON object per update.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::aggregate::{AggregateSnapshot, InvalidSourceId, SourceId};

/// Commands accepted by the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcCommand {
    Query,
    Count(SourceId),
    Refresh,
    Status,
    Watch,
    Post { source: SourceId, item_id: String },
    Dismiss { item_id: String },
    Grant,
    Revoke,
    Restart,
    Shutdown,
}

impl IpcCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Count(_) => "count",
            Self::Refresh => "refresh",
            Self::Status => "status",
            Self::Watch => "watch",
            Self::Post { .. } => "post",
            Self::Dismiss { .. } => "dismiss",
            Self::Grant => "grant",
            Self::Revoke => "revoke",
            Self::Restart => "restart",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for IpcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(source) => write!(f, "count {}", source),
            Self::Post { source, item_id } => write!(f, "post {} {}", source, item_id),
            Self::Dismiss { item_id } => write!(f, "dismiss {}", item_id),
            other => f.write_str(other.name()),
        }
    }
}

/// Errors parsing commands or replies
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{command}: missing argument <{argument}>")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{command}: unexpected argument '{argument}'")]
    UnexpectedArgument {
        command: &'static str,
        argument: String,
    },

    #[error(transparent)]
    InvalidSource(#[from] InvalidSourceId),

    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

impl FromStr for IpcCommand {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ProtocolError::Empty)?;

        let command = match name {
            "query" => Self::Query,
            "refresh" => Self::Refresh,
            "status" => Self::Status,
            "watch" => Self::Watch,
            "grant" => Self::Grant,
            "revoke" => Self::Revoke,
            "restart" => Self::Restart,
            "shutdown" => Self::Shutdown,
            "count" => Self::Count(SourceId::new(required(&mut words, "count", "source")?)?),
            "post" => {
                let source = SourceId::new(required(&mut words, "post", "source")?)?;
                let item_id = required(&mut words, "post", "item_id")?.to_string();
                Self::Post { source, item_id }
            }
            "dismiss" => Self::Dismiss {
                item_id: required(&mut words, "dismiss", "item_id")?.to_string(),
            },
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };

        if let Some(extra) = words.next() {
            return Err(ProtocolError::UnexpectedArgument {
                command: command.name(),
                argument: extra.to_string(),
            });
        }

        Ok(command)
    }
}

fn required<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, ProtocolError> {
    words
        .next()
        .ok_or(ProtocolError::MissingArgument { command, argument })
}

/// Reply to a single command
#[derive(Debug, Clone, PartialEq)]
pub enum IpcReply {
    Ok,
    Value(String),
    Snapshot(AggregateSnapshot),
    Error(String),
}

impl IpcReply {
    /// Render as a wire line without the trailing newline
    pub fn to_line(&self) -> String {
        match self {
            Self::Ok => "ok".to_string(),
            Self::Value(value) => value.clone(),
            Self::Snapshot(snapshot) => snapshot_line(snapshot),
            Self::Error(reason) => format!("error: {}", reason),
        }
    }
}

/// Encode a snapshot as a single JSON line
pub fn snapshot_line(snapshot: &AggregateSnapshot) -> String {
    serde_json::to_string(snapshot)
        .unwrap_or_else(|e| format!("error: failed to encode counts: {}", e))
}

/// Split a raw reply into its value or the daemon's error message
pub fn parse_reply(line: &str) -> Result<&str, String> {
    let line = line.trim();
    match line.strip_prefix("error:") {
        Some(reason) => Err(reason.trim().to_string()),
        None => Ok(line),
    }
}

/// Decode a counts line produced by [`snapshot_line`]
pub fn parse_counts(line: &str) -> Result<BTreeMap<String, u32>, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(|e| ProtocolError::MalformedReply(e.to_string()))
}
