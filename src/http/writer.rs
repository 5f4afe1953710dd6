//! Response writers.
//!
//! # Responsibilities
//! - Define the writable response surface handlers and the logger share
//! - Provide an in-memory writer the middleware streams response chunks through
//!
//! # Design Decisions
//! - Body bytes go through `std::io::Write` so decorators can wrap any writer
//! - Header and status access returns owned values, which lets writers keep
//!   their state behind a lock

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// Writable side of an HTTP exchange.
pub trait ResponseWriter: Write + Send {
    /// Current value of a response header.
    fn header(&self, name: &HeaderName) -> Option<HeaderValue>;

    /// Set a response header, replacing previous values.
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Status code that was (or will be) sent.
    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);
}

#[derive(Debug)]
struct RecorderState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// In-memory response writer. Clones observe the same response.
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(RecorderState {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
            })),
        }
    }
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the response headers.
    pub fn headers(&self) -> HeaderMap {
        self.lock().headers.clone()
    }

    /// Every byte written and not yet taken.
    pub fn body(&self) -> Bytes {
        Bytes::from(self.lock().body.clone())
    }

    /// Drain the bytes written since the last call.
    pub fn take_body(&self) -> Bytes {
        Bytes::from(std::mem::take(&mut self.lock().body))
    }
}

impl Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for ResponseRecorder {
    fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.lock().headers.get(name).cloned()
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.insert(name, value);
    }

    fn status(&self) -> StatusCode {
        self.lock().status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.lock().status = status;
    }
}
