//! Contextual logging subsystem.
//!
//! # Data Flow
//! ```text
//! caller / middleware
//!     → app_logger.rs (threshold check, field merge)
//!         ← fields.rs (per-logger field store)
//!         ← http::context (sid, custID from the request)
//!     → record.rs (timestamp, level, message, fields)
//!     → sink.rs (JSON lines, tracing events, memory)
//! ```
//!
//! # Design Decisions
//! - Threshold is fixed at construction; unknown level names fall back to INFO
//! - Fields are merged at write time, never shared between loggers
//! - Cloning a logger resets it: only the threshold and sink carry over
//! - Logging calls never return errors or panic

pub mod app_logger;
pub mod fields;
pub mod level;
pub mod record;
pub mod sink;

pub use app_logger::AppLogger;
pub use fields::FieldKey;
pub use record::Record;
pub use sink::{JsonSink, MemorySink, Sink, TracingSink};
