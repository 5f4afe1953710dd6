//! Small conversion helpers shared by services built on this crate.

pub mod json;
pub mod string;

pub use json::{to_json, to_json_bytes};
pub use string::{atoi, is_empty_or_null, is_not_empty_or_null, itoa, Itoa};
