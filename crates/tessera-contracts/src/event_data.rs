//! Structured event payloads.
//!
//! Payloads are a closed set of variants over sorted maps, so the canonical
//! JSON of an `EventData` is the same no matter in which order fields were
//! inserted. That is what makes the content hash deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single payload value.
///
/// Serialized untagged, so `EventData` reads and writes as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<EventValue>),
    Map(BTreeMap<String, EventValue>),
}

impl EventValue {
    /// Return the inner string if this value is `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for EventValue {
    fn from(value: &str) -> Self {
        EventValue::Text(value.to_string())
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> Self {
        EventValue::Text(value)
    }
}

impl From<bool> for EventValue {
    fn from(value: bool) -> Self {
        EventValue::Bool(value)
    }
}

impl From<i64> for EventValue {
    fn from(value: i64) -> Self {
        EventValue::Integer(value)
    }
}

impl From<f64> for EventValue {
    fn from(value: f64) -> Self {
        EventValue::Float(value)
    }
}

impl<T: Into<EventValue>> From<Vec<T>> for EventValue {
    fn from(values: Vec<T>) -> Self {
        EventValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// The top-level payload of an audit entry: a sorted map of named values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventData(BTreeMap<String, EventValue>);

impl EventData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning `self` for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EventValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<EventValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in canonical (sorted) key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &EventValue)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, EventValue> {
        self.0
    }

    /// Canonical JSON bytes: keys sorted at every nesting level, no
    /// whitespace.
    pub fn canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }
}

impl From<BTreeMap<String, EventValue>> for EventData {
    fn from(map: BTreeMap<String, EventValue>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<EventValue>> FromIterator<(K, V)> for EventData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
