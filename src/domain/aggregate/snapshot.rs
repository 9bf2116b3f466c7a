//! Aggregate snapshot value object

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::source::{ActiveItem, SourceId};

/// Immutable mapping from source identifier to active item count.
///
/// Cloning shares the underlying map; a snapshot never changes after it is built,
/// so a held copy cannot observe a later recomputation. Sources with no active
/// items are absent rather than present with a zero count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSnapshot {
    counts: Arc<BTreeMap<SourceId, u32>>,
}

impl AggregateSnapshot {
    /// Snapshot with no sources
    pub fn empty() -> Self {
        Self::default()
    }

    /// Group the given items by source and count them
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a ActiveItem>,
    {
        let mut counts: BTreeMap<SourceId, u32> = BTreeMap::new();
        for item in items {
            *counts.entry(item.source.clone()).or_insert(0) += 1;
        }
        Self {
            counts: Arc::new(counts),
        }
    }

    /// Active item count for a source, 0 if the source has none
    pub fn count_for(&self, source: &str) -> u32 {
        self.counts.get(source).copied().unwrap_or(0)
    }

    /// Total active items across all sources
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Number of distinct sources
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over (source, count) pairs in source order
    pub fn iter(&self) -> impl Iterator<Item = (&SourceId, u32)> {
        self.counts.iter().map(|(k, &v)| (k, v))
    }

    /// Copy out as a plain string-keyed map
    pub fn to_map(&self) -> BTreeMap<String, u32> {
        self.counts
            .iter()
            .map(|(k, &v)| (k.as_str().to_string(), v))
            .collect()
    }
}

impl Serialize for AggregateSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (source, count) in self.counts.iter() {
            map.serialize_entry(source.as_str(), count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, id: &str) -> ActiveItem {
        ActiveItem::new(SourceId::new(source).unwrap(), id)
    }

    #[test]
    fn empty_has_no_sources() {
        let snapshot = AggregateSnapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total(), 0);
        assert_eq!(snapshot.count_for("chat"), 0);
    }

    #[test]
    fn from_items_groups_by_source() {
        let items = vec![item("chat", "1"), item("chat", "2"), item("mail", "3")];
        let snapshot = AggregateSnapshot::from_items(&items);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.count_for("chat"), 2);
        assert_eq!(snapshot.count_for("mail"), 1);
        assert_eq!(snapshot.total(), 3);
    }

    #[test]
    fn unknown_source_counts_zero() {
        let snapshot = AggregateSnapshot::from_items(&[item("chat", "1")]);
        assert_eq!(snapshot.count_for("calendar"), 0);
    }

    #[test]
    fn no_items_gives_empty_map_not_zero_entries() {
        let items: Vec<ActiveItem> = Vec::new();
        let snapshot = AggregateSnapshot::from_items(&items);
        assert!(snapshot.is_empty());
        assert!(snapshot.to_map().is_empty());
    }

    #[test]
    fn serializes_as_json_object() {
        let items = vec![item("mail", "3"), item("chat", "1"), item("chat", "2")];
        let snapshot = AggregateSnapshot::from_items(&items);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"chat":2,"mail":1}"#);
    }

    #[test]
    fn iter_is_source_ordered() {
        let items = vec![item("zulip", "1"), item("alerts", "2")];
        let snapshot = AggregateSnapshot::from_items(&items);
        let sources: Vec<&str> = snapshot.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(sources, vec!["alerts", "zulip"]);
    }
}
