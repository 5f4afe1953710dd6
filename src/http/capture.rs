//! Response body capture.
//!
//! `BodyCapture` decorates a [`ResponseWriter`]: every write is forwarded to
//! the wrapped writer and the accepted bytes are mirrored into a buffer the
//! logger reads once the response body has been sent.
//!
//! The buffer has no size cap; a large response is held in memory in full.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::{HeaderName, HeaderValue, StatusCode};

use crate::http::writer::ResponseWriter;

/// Read handle on the bytes mirrored by a [`BodyCapture`].
#[derive(Debug, Clone, Default)]
pub struct CapturedBody {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedBody {
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Captured bytes decoded as text (invalid UTF-8 is replaced).
    pub fn to_string_lossy(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&self, bytes: &[u8]) {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
    }
}

/// Writer decorator that mirrors the response body.
pub struct BodyCapture {
    inner: Box<dyn ResponseWriter>,
    captured: CapturedBody,
}

impl BodyCapture {
    pub fn new(inner: Box<dyn ResponseWriter>) -> Self {
        Self {
            inner,
            captured: CapturedBody::default(),
        }
    }

    /// Handle on the mirrored bytes; stays valid after the capture is dropped.
    pub fn captured(&self) -> CapturedBody {
        self.captured.clone()
    }
}

impl Write for BodyCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.captured.append(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ResponseWriter for BodyCapture {
    fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.inner.header(name)
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.insert_header(name, value);
    }

    fn status(&self) -> StatusCode {
        self.inner.status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.inner.set_status(status);
    }
}
