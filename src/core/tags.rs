//! Tags attached to every record a logger emits
//!
//! This module provides:
//! - `FieldValue`: scalar tag and metric values
//! - `Tag`: a literal value or a closure evaluated on every emission
//! - `Tags`: ordered tag set with shallow, last-writer-wins merging

use super::value::panic_message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Scalar value for tags and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> Json {
        match self {
            FieldValue::String(s) => Json::String(s.clone()),
            FieldValue::Int(i) => Json::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            FieldValue::Bool(b) => Json::Bool(*b),
            FieldValue::Null => Json::Null,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

type TagFn = dyn Fn() -> FieldValue + Send + Sync;

/// A tag value: fixed, or computed fresh on every emission
#[derive(Clone)]
pub enum Tag {
    Literal(FieldValue),
    Computed(Arc<TagFn>),
}

impl Tag {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> FieldValue + Send + Sync + 'static,
    {
        Tag::Computed(Arc::new(f))
    }

    /// Current value of the tag. A panicking closure yields `Null`.
    pub fn evaluate(&self) -> FieldValue {
        match self {
            Tag::Literal(value) => value.clone(),
            Tag::Computed(f) => match catch_unwind(AssertUnwindSafe(|| f())) {
                Ok(value) => value,
                Err(panic_info) => {
                    tracing::warn!(
                        reason = %panic_message(panic_info.as_ref()),
                        "computed tag panicked"
                    );
                    FieldValue::Null
                }
            },
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Tag::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<FieldValue> for Tag {
    fn from(value: FieldValue) -> Self {
        Tag::Literal(value)
    }
}

macro_rules! literal_tag_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Tag {
                fn from(value: $ty) -> Self {
                    Tag::Literal(value.into())
                }
            }
        )*
    };
}

literal_tag_from!(String, &str, i64, i32, u32, f64, bool);

/// Ordered tag set
#[derive(Debug, Clone, Default)]
pub struct Tags {
    entries: Vec<(String, Tag)>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag (builder style). An existing key keeps its position.
    #[must_use]
    pub fn with<K, V>(mut self, key: K, tag: V) -> Self
    where
        K: Into<String>,
        V: Into<Tag>,
    {
        self.insert(key, tag);
        self
    }

    pub fn insert<K, V>(&mut self, key: K, tag: V)
    where
        K: Into<String>,
        V: Into<Tag>,
    {
        let key = key.into();
        let tag = tag.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = tag,
            None => self.entries.push((key, tag)),
        }
    }

    /// Shallow merge; `extra` wins on collisions. Neither input changes.
    #[must_use]
    pub fn merged(&self, extra: &Tags) -> Tags {
        let mut merged = self.clone();
        for (key, tag) in &extra.entries {
            merged.insert(key.clone(), tag.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate every tag into a JSON object
    pub fn evaluate(&self) -> Map<String, Json> {
        self.entries
            .iter()
            .map(|(key, tag)| (key.clone(), tag.evaluate().to_json_value()))
            .collect()
    }
}
