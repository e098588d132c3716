//! Structured key-value fields attached to loggers and records
//!
//! A [`Fields`] map is built when a child logger is derived and is never
//! mutated afterwards. Child maps are copies of the parent map with the new
//! keys inserted, so a later key shadows an earlier one.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

/// Conventional key under which errors are attached.
pub const ERROR_KEY: &str = "error";

/// Key receiving the `;`-joined stack of an error that exposes one.
pub const ERROR_STACK_KEY: &str = "err.stack";

/// Key receiving the caller location when caller reporting is on.
pub const FILE_KEY: &str = "file";

/// Field set owned by a logger instance.
pub type Fields = BTreeMap<String, FieldValue>;

/// Optional capability for error types that carry a captured stack trace.
///
/// The facade never depends on a concrete error type; it only asks whether
/// the attached value came with a stack.
pub trait StackProvider: StdError {
    /// Frames, outermost first.
    fn stack(&self) -> Vec<String>;
}

/// An error rendered into a field value.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub message: String,
    pub stack: Option<Vec<String>>,
}

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Error(ErrorValue),
    Null,
}

impl FieldValue {
    /// Render an error and its `source()` chain, joined by `": "`.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        FieldValue::Error(ErrorValue {
            message: error_chain(err),
            stack: None,
        })
    }

    /// Render an error that also exposes its stack trace.
    pub fn from_stack_error<E>(err: &E) -> Self
    where
        E: StackProvider + 'static,
    {
        FieldValue::Error(ErrorValue {
            message: error_chain(err),
            stack: Some(err.stack()),
        })
    }

    /// Stack frames, if this value is an error carrying them.
    pub fn stack(&self) -> Option<&[String]> {
        match self {
            FieldValue::Error(ErrorValue {
                stack: Some(frames),
                ..
            }) => Some(frames),
            _ => None,
        }
    }

    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Error(e) => serde_json::Value::String(e.message.clone()),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Error(e) => write!(f, "{}", e.message),
            FieldValue::Null => write!(f, "null"),
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

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::String(s.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        match i64::try_from(i) {
            Ok(v) => FieldValue::Int(v),
            Err(_) => FieldValue::String(i.to_string()),
        }
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::from(i as u64)
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

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
