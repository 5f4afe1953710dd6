//! Field keys and per-logger field store.

use std::collections::HashMap;
use std::fmt;

/// Record key for the synthetic log identifier.
pub const LOG_ID: &str = "logID";

/// Context key holding the session identifier.
pub const SID: &str = "sid";

/// Context key holding the customer identifier.
pub const CUST_ID: &str = "custID";

/// Key of a caller-attached field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    AppName,
    RefId,
    ServiceName,
    Custom(String),
}

impl FieldKey {
    pub fn as_str(&self) -> &str {
        match self {
            FieldKey::AppName => "appName",
            FieldKey::RefId => "refID",
            FieldKey::ServiceName => "serviceName",
            FieldKey::Custom(key) => key.as_str(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FieldKey {
    fn from(key: &str) -> Self {
        match key {
            "appName" => FieldKey::AppName,
            "refID" => FieldKey::RefId,
            "serviceName" => FieldKey::ServiceName,
            other => FieldKey::Custom(other.to_string()),
        }
    }
}

impl From<String> for FieldKey {
    fn from(key: String) -> Self {
        FieldKey::from(key.as_str())
    }
}

/// String fields merged into every record a logger emits.
///
/// Iteration order is unspecified.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    fields: HashMap<String, String>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: FieldKey, value: impl Into<String>) {
        self.fields.insert(key.as_str().to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
