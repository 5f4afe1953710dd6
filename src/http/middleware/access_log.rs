//! Access Log Middleware.
//! Emits a `"request"` and a `"response"` record for every request.
//!
//! The response body is forwarded chunk by chunk as the handler produces it,
//! so streamed responses (SSE, long polling) reach the client unchanged.

use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use axum::{
    body::{Body, BodyDataStream, Bytes},
    extract::{Request, State},
    http::{
        header::CONTENT_TYPE,
        HeaderName,
    },
    middleware::Next,
    response::Response,
};
use futures_util::{Stream, StreamExt};
use tracing::warn;

use crate::config::LoggerConfig;
use crate::http::context::{RequestBody, RequestContext};
use crate::http::writer::ResponseRecorder;
use crate::logger::{AppLogger, FieldKey};

/// Shared middleware state: a template logger and the request headers
/// copied into each request's context.
#[derive(Clone)]
pub struct AccessLog {
    template: Arc<AppLogger>,
    static_fields: Arc<Vec<(FieldKey, String)>>,
    context_headers: Arc<Vec<(HeaderName, String)>>,
}

impl AccessLog {
    /// Use `template`'s threshold, sink and fields for every request.
    pub fn new(template: AppLogger) -> Self {
        let static_fields = template
            .fields()
            .iter()
            .map(|(key, value)| (FieldKey::from(key), value.to_string()))
            .collect();
        Self {
            template: Arc::new(template),
            static_fields: Arc::new(static_fields),
            context_headers: Arc::new(Vec::new()),
        }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(AppLogger::from_config(config)).with_context_headers(
            config
                .context_headers
                .iter()
                .map(|(header, key)| (header.as_str(), key.as_str())),
        )
    }

    /// Copy each `(header, key)` request header into the context store under
    /// `key`. Invalid header names are skipped.
    pub fn with_context_headers<'a, I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut parsed = Vec::new();
        for (header, key) in headers {
            match HeaderName::from_bytes(header.as_bytes()) {
                Ok(name) => parsed.push((name, key.to_string())),
                Err(_) => warn!(header = %header, "Ignoring invalid context header name"),
            }
        }
        self.context_headers = Arc::new(parsed);
        self
    }

    /// Fresh per-request logger carrying the configured fields.
    pub fn logger(&self) -> AppLogger {
        let mut logger = self.template.as_ref().clone();
        for (key, value) in self.static_fields.iter() {
            logger.with_field(key.clone(), value.clone());
        }
        logger
    }
}

fn is_file_upload(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

pub async fn access_log_middleware(
    State(access): State<AccessLog>,
    request: Request,
    next: Next,
) -> Response {
    let mut log = access.logger();
    let recorder = ResponseRecorder::new();
    let file_upload = is_file_upload(&request);
    let (parts, body) = request.into_parts();

    // 1. Buffer the request body so the logger can read it. Uploads stream
    //    through untouched.
    let (ctx, passthrough) = if file_upload {
        (RequestContext::new(&parts, None, recorder.clone()), Some(body))
    } else {
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %parts.uri.path(), error = %e, "Failed to buffer request body");
                Bytes::new()
            }
        };
        let buffered: RequestBody = Box::new(Cursor::new(bytes));
        (RequestContext::new(&parts, Some(buffered), recorder.clone()), None)
    };

    for (header, key) in access.context_headers.iter() {
        let value = ctx.header(header.as_str());
        if !value.is_empty() {
            ctx.set(key.as_str(), value);
        }
    }

    // 2. Request record
    log.with_context(ctx.clone());
    log.log_request_start();

    // 3. Hand the restored body to the handler
    let body = match passthrough {
        Some(body) => body,
        None => ctx.read_body().map(Body::from).unwrap_or_else(|_| Body::empty()),
    };
    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(ctx.clone());

    let response = next.run(request).await;

    // 4. Hand the response head to the context writer
    let (parts, body) = response.into_parts();
    ctx.set_status(parts.status);
    for (name, value) in parts.headers.iter() {
        ctx.insert_response_header(name.clone(), value.clone());
    }

    // 5. Stream the body through the capture; the response record is written
    //    when the body ends or is dropped.
    let body = LoggedBody {
        inner: body.into_data_stream(),
        ctx,
        recorder,
        log: Some(log),
    };
    Response::from_parts(parts, Body::from_stream(body))
}

/// Response body that tees every chunk through the context writer.
struct LoggedBody {
    inner: BodyDataStream,
    ctx: RequestContext,
    recorder: ResponseRecorder,
    log: Option<AppLogger>,
}

impl LoggedBody {
    /// Write `chunk` through the context and return what reached the client
    /// writer. Falls back to the original chunk if the write fails.
    fn tee(&self, chunk: Bytes) -> Bytes {
        match self.ctx.write_all(&chunk) {
            Ok(()) => self.recorder.take_body(),
            Err(e) => {
                warn!(path = %self.ctx.path(), error = %e, "Failed to write response body");
                chunk
            }
        }
    }

    fn finish(&mut self) {
        if let Some(mut log) = self.log.take() {
            log.log_request_end();
        }
    }
}

impl Stream for LoggedBody {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match ready!(this.inner.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => Poll::Ready(Some(Ok(this.tee(chunk)))),
            Some(Err(e)) => {
                warn!(path = %this.ctx.path(), error = %e, "Response body failed");
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.finish();
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for LoggedBody {
    fn drop(&mut self) {
        self.finish();
    }
}
