//! Validation changelog.
//!
//! An ordered `key -> message` mapping of every correction the validator made.
//! Keys are top-level parameter names (`ticker`, `interval`, `strategy`, ...)
//! or nested `<side>:<Constructor>.<param>` paths. Recording an existing key
//! replaces its message in place.

use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationChanges {
    entries: Vec<Change>,
}

impl ValidationChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: impl Into<String>, message: impl Into<String>) {
        let key = key.into();
        let message = message.into();
        log::warn!("validation change [{}]: {}", key, message);
        match self.entries.iter_mut().find(|c| c.key == key) {
            Some(existing) => existing.message = message,
            None => self.entries.push(Change { key, message }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.message.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ValidationChanges {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for change in &self.entries {
            map.serialize_entry(&change.key, &change.message)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_insertion_order() {
        let mut changes = ValidationChanges::new();
        changes.record("ticker", "bad ticker");
        changes.record("interval", "bad interval");
        let keys: Vec<&str> = changes.keys().collect();
        assert_eq!(keys, vec!["ticker", "interval"]);
    }

    #[test]
    fn same_key_last_write_wins_in_place() {
        let mut changes = ValidationChanges::new();
        changes.record("a", "first");
        changes.record("b", "second");
        changes.record("a", "third");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get("a"), Some("third"));
        assert_eq!(changes.keys().next(), Some("a"));
    }

    #[test]
    fn serializes_as_ordered_map() {
        let mut changes = ValidationChanges::new();
        changes.record("ticker", "expected Ticker");
        changes.record("buy_condition:AND.conditions[0]", "dropped");
        let json = serde_json::to_string(&changes).unwrap();
        assert_eq!(
            json,
            r#"{"ticker":"expected Ticker","buy_condition:AND.conditions[0]":"dropped"}"#
        );
    }
}
