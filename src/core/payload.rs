//! Batch payload handed to transports
//!
//! Wire shape: `{ "<category>": [record, ...], ... }`. Categories whose
//! batch came out empty may still be present with an empty list.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// One formatted, immutable unit of telemetry data
pub type Record = Json;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    batches: BTreeMap<String, Vec<Record>>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, records: Vec<Record>) {
        self.batches.insert(category.into(), records);
    }

    pub fn get(&self, category: &str) -> Option<&[Record]> {
        self.batches.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.batches.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.batches
            .iter()
            .map(|(category, records)| (category.as_str(), records.as_slice()))
    }

    /// True when no category carries a record
    pub fn is_empty(&self) -> bool {
        self.batches.values().all(Vec::is_empty)
    }

    /// Total number of records across categories
    pub fn record_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub(crate) fn into_batches(self) -> BTreeMap<String, Vec<Record>> {
        self.batches
    }
}

impl FromIterator<(String, Vec<Record>)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Record>)>>(iter: I) -> Self {
        Self {
            batches: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_categories_do_not_count() {
        let mut payload = Payload::new();
        assert!(payload.is_empty());

        payload.insert("logs", vec![]);
        assert!(payload.is_empty());
        assert_eq!(payload.categories().count(), 1);

        payload.insert("stats", vec![json!({"stat": "increment"})]);
        assert!(!payload.is_empty());
        assert_eq!(payload.record_count(), 1);
    }

    #[test]
    fn test_wire_shape() {
        let mut payload = Payload::new();
        payload.insert("logs", vec![json!("first-log")]);
        payload.insert("stats", vec![]);

        let encoded: Json = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(encoded, json!({"logs": ["first-log"], "stats": []}));
    }
}
