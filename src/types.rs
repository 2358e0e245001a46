//! Core types shared by storages, the registry and repository adapters.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between segments of a flattened key.
pub const KEY_SEPARATOR: char = '.';

/// Key prefix used by [`crate::storage::Storage::add_paths`].
pub const DIR_PREFIX: &str = "dir";

/// Key prefix used by [`crate::storage::Storage::add_urls`].
pub const URL_PREFIX: &str = "url";

/// A single `(storage, key, value)` triple as read from or written to a repository.
///
/// Records are immutable once built; fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    storage: String,
    key: String,
    value: Value,
}

impl Record {
    /// Build a record. Both `storage` and `key` must be non-empty.
    pub fn new(
        storage: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> ConfigResult<Self> {
        let storage = storage.into();
        let key = key.into();
        if storage.is_empty() || key.is_empty() {
            return Err(ConfigError::invalid_record(&storage, &key));
        }
        Ok(Self {
            storage,
            key,
            value: value.into(),
        })
    }

    pub fn storage(&self) -> &str {
        &self.storage
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Split the record into its parts.
    pub fn into_parts(self) -> (String, String, Value) {
        (self.storage, self.key, self.value)
    }
}

/// Join a dotted prefix and a local name.
pub fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, KEY_SEPARATOR, name)
    }
}

/// Whether a value counts as "set".
///
/// Null, `false`, zero, the empty string, the string `"0"` and empty
/// arrays or objects are all treated as not set.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Decode a string holding a serialized compound value.
///
/// Only JSON arrays and objects qualify. Anything else, including strings
/// that merely look like JSON scalars, yields `None`.
pub fn decode_serialized(value: &Value) -> Option<Value> {
    let Value::String(raw) = value else {
        return None;
    };
    let trimmed = raw.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(decoded @ (Value::Array(_) | Value::Object(_))) => Some(decoded),
        _ => None,
    }
}

/// Encode a compound value into its serialized string form.
///
/// Scalars are returned unchanged.
pub fn encode_serialized(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}
