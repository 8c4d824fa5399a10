use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Normalized identity of an entity inside a collection.
///
/// Snowflakes arrive both as JSON numbers and as numeric strings, so both
/// forms normalize to the same textual key: `1` and `"1"` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Builds a key from a JSON scalar. Objects, arrays, null and empty
    /// strings carry no identity.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) if !s.is_empty() => Some(Self(s.clone())),
            JsonValue::Number(n) => Some(Self(n.to_string())),
            JsonValue::Bool(b) => Some(Self(b.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Matches a raw JSON value against this key using the same
    /// normalization as `from_json`.
    pub fn matches(&self, value: &JsonValue) -> bool {
        Self::from_json(value).is_some_and(|other| other == *self)
    }

    /// JSON form used when the key is echoed back into a payload. Numeric
    /// keys become numbers again.
    pub fn to_json(&self) -> JsonValue {
        match self.0.parse::<u64>() {
            Ok(n) => JsonValue::from(n),
            Err(_) => JsonValue::String(self.0.clone()),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for EntityKey {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}
