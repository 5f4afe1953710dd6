//! JSON encoding that never fails the caller.

use serde::Serialize;

/// Encode `value` as JSON text; empty on failure.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Encode `value` as JSON bytes; empty on failure.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}
