//! The structured record handed to a sink.

use chrono::Local;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::Level;

/// Timestamp layout: ISO8601 with milliseconds and numeric offset.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// One emitted log entry.
///
/// Serializes as a single flat JSON object:
/// `{"timestamp":..,"level":"INFO","message":..,<fields>..}`.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub timestamp: String,
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Build a record stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            level,
            message: message.into(),
            fields,
        }
    }

    /// Look up a field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a string field by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Encode as one JSON line (without the trailing newline).
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn serialize_level<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(level.as_str())
}
