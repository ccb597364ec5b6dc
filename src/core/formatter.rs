//! Sanitizing formatter
//!
//! Turns an application [`Value`] into a bounded, redaction-aware JSON shape.
//! Objects deeper than `max_object_depth` collapse to `"-pruned-"`, arrays
//! are cut after `max_array_length` elements, and fields missing from the
//! whitelist are replaced by redaction sentinels.
//!
//! Sentinels inside arrays follow the type of the element they stand in
//! for (`"-pruned-"`, `["-pruned-"]`, `{"pruned": true}`), because the
//! collector rejects arrays that mix strings with objects or arrays. The
//! same rule applies to redacted fields.

use super::value::{ErrorValue, Value};
use super::whitelist::Whitelist;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value as Json};
use std::borrow::Cow;
use std::sync::Arc;

pub const PRUNED: &str = "-pruned-";
pub const REDACTED: &str = "-redacted-";
pub const FUNCTION_PLACEHOLDER: &str = "<Function>";

/// Getters returning getters are followed at most this many times
const MAX_GETTER_HOPS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    pub max_object_depth: usize,
    pub max_array_length: usize,
    pub whitelist: Option<Whitelist>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_object_depth: 3,
            max_array_length: 10,
            whitelist: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    Array,
    Object,
}

impl Shape {
    fn of(value: &Value) -> Self {
        match value {
            Value::Array(_) => Shape::Array,
            Value::Object(_) | Value::Error(_) => Shape::Object,
            _ => Shape::Scalar,
        }
    }

    fn pruned(self) -> Json {
        match self {
            Shape::Scalar => Json::String(PRUNED.to_string()),
            Shape::Array => json!([PRUNED]),
            Shape::Object => json!({ "pruned": true }),
        }
    }

    fn redacted(self) -> Json {
        match self {
            Shape::Scalar => Json::String(REDACTED.to_string()),
            Shape::Array => json!([REDACTED]),
            Shape::Object => json!({ "redacted": true }),
        }
    }
}

/// Depth/length-bounded, field-redacting serializer.
///
/// Never fails: failing getters and panicking accessors degrade to
/// sentinels at the field they occur in.
#[derive(Debug, Clone)]
pub struct Formatter {
    max_object_depth: usize,
    max_array_length: usize,
    whitelist: Option<Arc<Whitelist>>,
}

impl Formatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self {
            max_object_depth: config.max_object_depth,
            max_array_length: config.max_array_length,
            whitelist: config
                .whitelist
                .filter(|whitelist| !whitelist.is_empty())
                .map(Arc::new),
        }
    }

    pub fn max_object_depth(&self) -> usize {
        self.max_object_depth
    }

    pub fn max_array_length(&self) -> usize {
        self.max_array_length
    }

    /// Format a top-level value. `None` means the value is undefined.
    pub fn format(&self, value: &Value) -> Option<Json> {
        self.format_value(value, 0, &mut Vec::new())
    }

    /// Format a value as if it sat at `depth` below the root, under the
    /// whitelist path `path`.
    pub fn format_at<S: AsRef<str>>(&self, value: &Value, depth: usize, path: &[S]) -> Option<Json> {
        let mut path = path.iter().map(|p| p.as_ref().to_string()).collect();
        self.format_value(value, depth, &mut path)
    }

    fn format_value(&self, value: &Value, depth: usize, path: &mut Vec<String>) -> Option<Json> {
        match value {
            Value::Undefined => None,
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Int(i) => Some(Json::from(*i)),
            Value::Float(f) => Some(
                Number::from_f64(*f)
                    .map(Json::Number)
                    .unwrap_or(Json::Null),
            ),
            Value::String(s) => Some(Json::String(s.clone())),
            Value::Function => Some(Json::String(FUNCTION_PLACEHOLDER.to_string())),
            Value::Error(err) => Some(format_error(err)),
            Value::Array(items) => Some(self.format_array(items, depth, path)),
            Value::Object(fields) => Some(self.format_object(fields, depth, path)),
            Value::Getter(_) => match resolve(value) {
                Ok(resolved) => self.format_value(&resolved, depth, path),
                Err(reason) => {
                    tracing::debug!(path = %path.join("."), %reason, "unreadable value pruned");
                    Some(Shape::Scalar.pruned())
                }
            },
        }
    }

    fn format_array(&self, items: &[Value], depth: usize, path: &mut Vec<String>) -> Json {
        if depth >= self.max_object_depth {
            return Shape::Array.pruned();
        }

        let mut formatted = Vec::with_capacity(items.len().min(self.max_array_length + 1));
        let mut last_shape = Shape::Scalar;

        for (index, item) in items.iter().enumerate() {
            if index == self.max_array_length {
                formatted.push(last_shape.pruned());
                break;
            }

            match resolve(item) {
                Ok(resolved) => {
                    last_shape = Shape::of(&resolved);
                    formatted.push(
                        self.format_value(&resolved, depth + 1, path)
                            .unwrap_or(Json::Null),
                    );
                }
                Err(reason) => {
                    tracing::debug!(path = %path.join("."), index, %reason, "unreadable element pruned");
                    last_shape = Shape::Scalar;
                    formatted.push(Shape::Scalar.pruned());
                }
            }
        }

        Json::Array(formatted)
    }

    fn format_object(&self, fields: &[(String, Value)], depth: usize, path: &mut Vec<String>) -> Json {
        if depth >= self.max_object_depth {
            return Shape::Scalar.pruned();
        }

        let mut formatted = Map::new();

        for (key, field) in fields {
            path.push(key.clone());
            let allowed = self
                .whitelist
                .as_ref()
                .map_or(true, |whitelist| whitelist.allows(path.as_slice()));

            let rendered = match resolve(field) {
                Ok(resolved) if allowed => self.format_value(&resolved, depth + 1, path),
                Ok(resolved) => Some(Shape::of(&resolved).redacted()),
                Err(reason) => {
                    tracing::debug!(path = %path.join("."), %reason, "unreadable field contained");
                    Some(if allowed {
                        Shape::Scalar.pruned()
                    } else {
                        Shape::Scalar.redacted()
                    })
                }
            };
            path.pop();

            if let Some(rendered) = rendered {
                formatted.insert(key.clone(), rendered);
            }
        }

        Json::Object(formatted)
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(FormatterConfig::default())
    }
}

fn format_error(err: &ErrorValue) -> Json {
    let mut formatted = Map::new();
    formatted.insert("message".to_string(), Json::from(err.message()));
    if let Some(stack) = err.stack() {
        formatted.insert("stack".to_string(), Json::from(stack));
    }
    Json::Object(formatted)
}

/// Follow getters until a concrete value is reached
fn resolve(value: &Value) -> Result<Cow<'_, Value>, String> {
    let Value::Getter(getter) = value else {
        return Ok(Cow::Borrowed(value));
    };

    let mut current = getter.read()?;
    for _ in 0..MAX_GETTER_HOPS {
        match current {
            Value::Getter(next) => current = next.read()?,
            resolved => return Ok(Cow::Owned(resolved)),
        }
    }
    Err(format!("getter chain longer than {} hops", MAX_GETTER_HOPS))
}
