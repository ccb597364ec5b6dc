//! Application values handed to the logger
//!
//! `Value` is an explicit, ordered data model for anything an application
//! wants to attach to a log record. The formatter works over this model
//! instead of reflecting over arbitrary objects, so field order, error
//! detection, and failing accessors behave the same everywhere.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type GetterFn = dyn Fn() -> std::result::Result<Value, String> + Send + Sync;

/// A lazily-read field.
///
/// Reading may fail (the closure returns `Err`) or panic; both are reported
/// as `Err` by [`Getter::read`]. A getter that returns its own parent object
/// is how cyclic graphs are expressed.
#[derive(Clone)]
pub struct Getter(Arc<GetterFn>);

impl Getter {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(read))
    }

    /// Read the field, isolating panics raised by the accessor
    pub fn read(&self) -> std::result::Result<Value, String> {
        match catch_unwind(AssertUnwindSafe(|| (self.0)())) {
            Ok(result) => result,
            Err(panic_info) => Err(panic_message(panic_info.as_ref())),
        }
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Getter(..)")
    }
}

impl PartialEq for Getter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

pub(crate) fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// An error attached to a record. Formats as a flat `{message, stack}` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    message: String,
    stack: Option<String>,
    acked: bool,
}

impl ErrorValue {
    /// Create an error from a bare message
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let stack = format!("Error: {}", message);
        Self {
            message,
            stack: Some(stack),
            acked: false,
        }
    }

    /// Capture an error together with its `source()` chain
    ///
    /// A backtrace is appended to the stack when `RUST_BACKTRACE` enables
    /// capturing.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let message = err.to_string();
        let mut stack = format!("Error: {}", message);

        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }

        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            stack.push('\n');
            stack.push_str(&backtrace.to_string());
        }

        Self {
            message,
            stack: Some(stack),
            acked: false,
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn without_stack(mut self) -> Self {
        self.stack = None;
        self
    }

    /// Mark the error as already reported elsewhere.
    ///
    /// `Logger::error` ignores calls that carry an acknowledged error.
    #[must_use]
    pub fn acknowledge(mut self) -> Self {
        self.acked = true;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn is_acked(&self) -> bool {
        self.acked
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.message)
    }
}

/// Any value an application can log
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A callable; only its presence is recorded
    Function,
    Error(ErrorValue),
    Array(Vec<Value>),
    /// Own fields in insertion order
    Object(Vec<(String, Value)>),
    Getter(Getter),
}

impl Value {
    /// Build an object from ordered key/value pairs
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<T, I>(items: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn getter<F>(read: F) -> Self
    where
        F: Fn() -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        Value::Getter(Getter::new(read))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(ErrorValue::new(message))
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write_nested(f, other),
        }
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(i) => write!(f, "{}", i),
        Value::Float(fl) => write!(f, "{}", fl),
        Value::String(s) => write!(f, "{:?}", s),
        Value::Function => f.write_str("[Function]"),
        Value::Error(err) => write!(f, "{}", err),
        Value::Getter(_) => f.write_str("[Getter]"),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_nested(f, item)?;
            }
            f.write_str("]")
        }
        Value::Object(fields) => {
            if fields.is_empty() {
                return f.write_str("{}");
            }
            f.write_str("{ ")?;
            for (i, (key, item)) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: ", key)?;
                write_nested(f, item)?;
            }
            f.write_str(" }")
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(Value::Int)
            .unwrap_or(Value::Float(i as f64))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::from(i as u64)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f as f64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<ErrorValue> for Value {
    fn from(err: ErrorValue) -> Self {
        Value::Error(err)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
