//! Dynamic values carried across fiber resumes and completions
//!
//! The scheduler never inspects these beyond truthiness; they are opaque
//! cargo handed from a resume callback (or a completing frame) to the
//! frame beneath it.

use std::fmt;

/// A dynamically typed value delivered to a resuming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value (a bare resume carries this).
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Priorities are numbers too.
    Number(f64),
    /// A string.
    Text(String),
}

impl Value {
    /// Whether the value counts as "truthy" for bootstrap exit mapping:
    /// everything except `Null`, `false`, `0`, `NaN`, and `""`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
        }
    }

    /// The numeric payload, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string payload, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
