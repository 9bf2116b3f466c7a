//! Source identity and active item value objects

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error when a source identifier is empty
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid source identifier: \"{input}\". Source identifiers must not be empty")]
pub struct InvalidSourceId {
    pub input: String,
}

/// Opaque key naming the origin of notification items (usually an application id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Create a source identifier, rejecting empty strings
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidSourceId> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(InvalidSourceId { input: value });
        }
        Ok(Self(value))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SourceId {
    type Err = InvalidSourceId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Borrow<str> for SourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A notification currently present on the platform.
///
/// Only presence and origin matter; content is never carried.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveItem {
    pub source: SourceId,
    pub item_id: String,
}

impl ActiveItem {
    /// Create a new active item
    pub fn new(source: SourceId, item_id: impl Into<String>) -> Self {
        Self {
            source,
            item_id: item_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_accepts_non_empty() {
        let id = SourceId::new("com.example.chat").unwrap();
        assert_eq!(id.as_str(), "com.example.chat");
        assert_eq!(id.to_string(), "com.example.chat");
    }

    #[test]
    fn source_id_rejects_empty() {
        assert!(SourceId::new("").is_err());
        assert!(SourceId::new("   ").is_err());
    }

    #[test]
    fn source_id_parses() {
        let id: SourceId = "mail".parse().unwrap();
        assert_eq!(id.as_str(), "mail");
    }

    #[test]
    fn source_id_serializes_as_plain_string() {
        let id = SourceId::new("chat").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"chat\"");
    }

    #[test]
    fn error_display() {
        let err = SourceId::new("").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
