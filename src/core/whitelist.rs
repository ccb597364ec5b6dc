//! Field whitelist used for redaction
//!
//! A whitelist is a tree of field names. A field at path `a.b.c` is kept
//! only if every step resolves and the final node is truthy:
//!
//! ```
//! use client_telemetry::Whitelist;
//!
//! let whitelist: Whitelist = serde_json::from_str(r#"{"user": {"id": true}}"#).unwrap();
//! assert!(whitelist.allows(&["user"]));
//! assert!(whitelist.allows(&["user", "id"]));
//! assert!(!whitelist.allows(&["user", "email"]));
//! ```
//!
//! A `true` leaf admits the field itself but does not open its subtree:
//! `{"meta": true}` keeps `meta`, while every field nested inside it is
//! redacted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhitelistNode {
    Flag(bool),
    Nested(Whitelist),
}

impl WhitelistNode {
    fn is_truthy(&self) -> bool {
        match self {
            WhitelistNode::Flag(allowed) => *allowed,
            WhitelistNode::Nested(_) => true,
        }
    }
}

impl From<bool> for WhitelistNode {
    fn from(allowed: bool) -> Self {
        WhitelistNode::Flag(allowed)
    }
}

impl From<Whitelist> for WhitelistNode {
    fn from(nested: Whitelist) -> Self {
        WhitelistNode::Nested(nested)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Whitelist {
    fields: BTreeMap<String, WhitelistNode>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a single field
    #[must_use]
    pub fn allow(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), WhitelistNode::Flag(true));
        self
    }

    /// Allow a field and descend into it
    #[must_use]
    pub fn nested(mut self, field: impl Into<String>, subtree: Whitelist) -> Self {
        self.fields
            .insert(field.into(), WhitelistNode::Nested(subtree));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the field at `path` survives redaction
    pub fn allows<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };

        let mut current = self;
        for part in parents {
            match current.fields.get(part.as_ref()) {
                Some(WhitelistNode::Nested(subtree)) => current = subtree,
                _ => return false,
            }
        }

        current
            .fields
            .get(last.as_ref())
            .is_some_and(WhitelistNode::is_truthy)
    }
}
