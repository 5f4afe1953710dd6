//! Request-scoped context shared by the logger and handlers.
//!
//! # Responsibilities
//! - Expose the request line and headers
//! - Hold the read-once request body
//! - Hold the replaceable response writer slot
//! - Carry a small string key/value store (session id, customer id, ...)
//!
//! # Design Decisions
//! - Cloning a `RequestContext` clones a handle; all clones see one request
//! - Lock poisoning is recovered, never propagated to the caller

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use dashmap::DashMap;

use crate::http::writer::ResponseWriter;

/// Readable-once request body.
pub type RequestBody = Box<dyn Read + Send>;

struct ContextInner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Mutex<Option<RequestBody>>,
    values: DashMap<String, String>,
    writer: Mutex<Option<Box<dyn ResponseWriter>>>,
}

/// Handle on one in-flight request.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl RequestContext {
    /// Create a context from request parts, an optional body and the writer
    /// the response goes to.
    pub fn new<W>(parts: &Parts, body: Option<RequestBody>, writer: W) -> Self
    where
        W: ResponseWriter + 'static,
    {
        Self {
            inner: Arc::new(ContextInner {
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                headers: parts.headers.clone(),
                body: Mutex::new(body),
                values: DashMap::new(),
                writer: Mutex::new(Some(Box::new(writer))),
            }),
        }
    }

    /// Create a context from a fully buffered request.
    pub fn from_request<B, W>(request: Request<B>, writer: W) -> Self
    where
        B: Into<Bytes>,
        W: ResponseWriter + 'static,
    {
        let (parts, body) = request.into_parts();
        let body: RequestBody = Box::new(io::Cursor::new(body.into()));
        Self::new(&parts, Some(body), writer)
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Request header value as text; empty when absent or not visible ASCII.
    pub fn header(&self, name: impl AsRef<str>) -> &str {
        self.inner
            .headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    // ---- body ----

    fn body_slot(&self) -> MutexGuard<'_, Option<RequestBody>> {
        self.inner.body.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_body(&self) -> bool {
        self.body_slot().is_some()
    }

    /// Take the body out of the context. Subsequent calls return `None`
    /// until a body is set again.
    pub fn take_body(&self) -> Option<RequestBody> {
        self.body_slot().take()
    }

    pub fn set_body<R>(&self, body: R)
    where
        R: Read + Send + 'static,
    {
        *self.body_slot() = Some(Box::new(body));
    }

    /// Consume the body and return its bytes. An absent body reads as empty.
    pub fn read_body(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut body) = self.take_body() {
            body.read_to_end(&mut buf)?;
        }
        Ok(buf)
    }

    // ---- key/value store ----

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.values.get(key).map(|v| v.value().clone())
    }

    /// Stored value for `key`, or an empty string.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default()
    }

    // ---- response writer ----

    fn writer_slot(&self) -> MutexGuard<'_, Option<Box<dyn ResponseWriter>>> {
        self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the response writer with a wrapper built around it.
    pub fn wrap_writer<F>(&self, wrap: F)
    where
        F: FnOnce(Box<dyn ResponseWriter>) -> Box<dyn ResponseWriter>,
    {
        let mut slot = self.writer_slot();
        if let Some(writer) = slot.take() {
            *slot = Some(wrap(writer));
        }
    }

    /// Write response bytes through the installed writer.
    ///
    /// Only the access log middleware feeds the writer; handlers answer
    /// through their axum response.
    pub(crate) fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        match self.writer_slot().as_mut() {
            Some(writer) => writer.write_all(buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "no response writer")),
        }
    }

    pub fn response_header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.writer_slot().as_ref().and_then(|w| w.header(name))
    }

    pub fn insert_response_header(&self, name: HeaderName, value: HeaderValue) {
        if let Some(writer) = self.writer_slot().as_mut() {
            writer.insert_header(name, value);
        }
    }

    /// Response status; `200 OK` until a handler sets one.
    pub fn status(&self) -> StatusCode {
        self.writer_slot()
            .as_ref()
            .map(|w| w.status())
            .unwrap_or(StatusCode::OK)
    }

    pub fn set_status(&self, status: StatusCode) {
        if let Some(writer) = self.writer_slot().as_mut() {
            writer.set_status(status);
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .finish_non_exhaustive()
    }
}
