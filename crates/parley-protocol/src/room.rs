//! Room names.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A validated room name: trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Trim `raw` and accept it if anything is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Coerce an arbitrary JSON value to a room name.
    ///
    /// Strings are used as-is, numbers and booleans by their textual form.
    /// `null`, arrays and objects have no usable name.
    pub fn from_value(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Self::parse(&n.to_string()),
            Value::Bool(b) => Self::parse(if *b { "true" } else { "false" }),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RoomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
