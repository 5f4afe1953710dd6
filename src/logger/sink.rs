//! Record sinks.
//!
//! # Responsibilities
//! - Encode records and hand them to an output
//! - Never surface write failures to the logging call
//!
//! # Design Decisions
//! - Level filtering happens in the logger, sinks write everything they get
//! - `JsonSink` reuses tracing-subscriber's `MakeWriter` so any writer the
//!   fmt layer accepts works here too
//! - `TracingSink` lets an application route records through its own subscriber

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::logger::record::Record;

/// Destination for emitted records.
pub trait Sink: Send + Sync {
    fn emit(&self, record: &Record);
}

/// Writes one JSON object per line.
pub struct JsonSink<W> {
    make_writer: W,
}

impl<W> JsonSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    pub fn new(make_writer: W) -> Self {
        Self { make_writer }
    }
}

impl JsonSink<fn() -> io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr as fn() -> io::Stderr)
    }
}

impl JsonSink<fn() -> io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout as fn() -> io::Stdout)
    }
}

impl<W> Sink for JsonSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    fn emit(&self, record: &Record) {
        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(_) => return,
        };
        line.push(b'\n');

        let mut writer = self.make_writer.make_writer();
        let _ = writer.write_all(&line);
    }
}

/// Forwards records to the global `tracing` dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn emit(&self, record: &Record) {
        let json = record.to_json();
        let message = record.message.as_str();
        match record.level {
            Level::ERROR => tracing::error!(target: "app_logger", record = %json, "{}", message),
            Level::WARN => tracing::warn!(target: "app_logger", record = %json, "{}", message),
            Level::INFO => tracing::info!(target: "app_logger", record = %json, "{}", message),
            Level::DEBUG => tracing::debug!(target: "app_logger", record = %json, "{}", message),
            _ => tracing::trace!(target: "app_logger", record = %json, "{}", message),
        }
    }
}

/// Keeps records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record emitted so far.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Sink for MemorySink {
    fn emit(&self, record: &Record) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
