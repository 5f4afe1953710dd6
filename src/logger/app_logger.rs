//! Contextual logger façade.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::http::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::level_filters::LevelFilter;
use tracing::Level;

use crate::config::{LoggerConfig, OutputKind};
use crate::http::capture::{BodyCapture, CapturedBody};
use crate::http::context::RequestContext;
use crate::logger::fields::{FieldKey, FieldStore, CUST_ID, LOG_ID, SID};
use crate::logger::level::level_or_default;
use crate::logger::record::Record;
use crate::logger::sink::{JsonSink, Sink, TracingSink};

const MULTIPART_FORM_DATA: &str = "multipart/form-data";
const APPLICATION_JSON: &str = "application/json";

/// Per-request state captured between `log_request_start` and
/// `log_request_end`.
#[derive(Default)]
struct Exchange {
    started: Option<Instant>,
    request_body: String,
    response_body: Option<CapturedBody>,
}

/// Logger that decorates records with its own fields and with values taken
/// from an attached [`RequestContext`].
///
/// An instance is meant to serve one request flow at a time. Create (or
/// [`clone`](Clone::clone)) one per request.
pub struct AppLogger {
    level: LevelFilter,
    sink: Arc<dyn Sink>,
    ctx: Option<RequestContext>,
    fields: FieldStore,
    exchange: Exchange,
}

impl AppLogger {
    /// Logger writing JSON lines to stderr. An unrecognized `level` falls
    /// back to `INFO`.
    pub fn new(level: &str) -> Self {
        Self::with_sink(level, Arc::new(JsonSink::stderr()))
    }

    pub fn with_sink(level: &str, sink: Arc<dyn Sink>) -> Self {
        Self {
            level: level_or_default(level),
            sink,
            ctx: None,
            fields: FieldStore::new(),
            exchange: Exchange::default(),
        }
    }

    /// Build a logger from configuration, applying the configured static
    /// fields.
    pub fn from_config(config: &LoggerConfig) -> Self {
        let sink: Arc<dyn Sink> = match config.output {
            OutputKind::Stderr => Arc::new(JsonSink::stderr()),
            OutputKind::Stdout => Arc::new(JsonSink::stdout()),
            OutputKind::Tracing => Arc::new(TracingSink),
        };
        let mut logger = Self::with_sink(&config.level, sink);
        for (key, value) in config.static_fields() {
            logger.with_field(key, value);
        }
        logger
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    pub fn context(&self) -> Option<&RequestContext> {
        self.ctx.as_ref()
    }

    /// Attach the request whose values decorate subsequent records.
    pub fn with_context(&mut self, ctx: RequestContext) -> &mut Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn clear_context(&mut self) -> &mut Self {
        self.ctx = None;
        self
    }

    /// Attach a field to every subsequent record, replacing any previous
    /// value for `key`.
    pub fn with_field(&mut self, key: impl Into<FieldKey>, value: impl Into<String>) -> &mut Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn debug<R, T>(&self, message: &str, ref_id: R, service_name: &str, result: T)
    where
        R: Serialize,
        T: Serialize,
    {
        self.log(Level::DEBUG, message, ref_id, service_name, result);
    }

    pub fn info<R, T>(&self, message: &str, ref_id: R, service_name: &str, result: T)
    where
        R: Serialize,
        T: Serialize,
    {
        self.log(Level::INFO, message, ref_id, service_name, result);
    }

    pub fn warn<R, T>(&self, message: &str, ref_id: R, service_name: &str, result: T)
    where
        R: Serialize,
        T: Serialize,
    {
        self.log(Level::WARN, message, ref_id, service_name, result);
    }

    pub fn error<R, T>(&self, message: &str, ref_id: R, service_name: &str, result: T)
    where
        R: Serialize,
        T: Serialize,
    {
        self.log(Level::ERROR, message, ref_id, service_name, result);
    }

    /// Emit one record at `level` carrying the call-supplied values.
    pub fn log<R, T>(&self, level: Level, message: &str, ref_id: R, service_name: &str, result: T)
    where
        R: Serialize,
        T: Serialize,
    {
        if !self.enabled(level) {
            return;
        }
        let mut fields = self.base_fields();
        fields.insert("refID".into(), to_value(&ref_id));
        fields.insert("serviceName".into(), json!(service_name));
        fields.insert("result".into(), to_value(&result));
        self.sink.emit(&Record::new(level, message, fields));
    }

    /// Mark the start of a request: buffer the request body, install a body
    /// capture on the response writer and emit the `"request"` record.
    ///
    /// Output, latency and status on this record are always empty/zero.
    pub fn log_request_start(&mut self) {
        self.exchange = Exchange {
            started: Some(Instant::now()),
            ..Exchange::default()
        };

        let Some(ctx) = self.ctx.clone() else {
            return;
        };

        let is_file_upload = ctx
            .header(CONTENT_TYPE.as_str())
            .starts_with(MULTIPART_FORM_DATA);
        if !is_file_upload {
            if let Some(mut body) = ctx.take_body() {
                let mut buf = Vec::new();
                match body.read_to_end(&mut buf) {
                    Ok(_) => {
                        self.exchange.request_body = String::from_utf8_lossy(&buf).into_owned();
                    }
                    Err(e) => {
                        tracing::debug!(path = %ctx.path(), error = %e, "Failed to read request body");
                    }
                }
                ctx.set_body(Cursor::new(buf));
            }
        }

        let mut captured = None;
        ctx.wrap_writer(|writer| {
            let capture = BodyCapture::new(writer);
            captured = Some(capture.captured());
            Box::new(capture)
        });
        self.exchange.response_body = captured;

        self.emit_exchange("request", &ctx, String::new(), 0, 0);
    }

    /// Emit the `"response"` record. Does nothing without an attached
    /// context.
    pub fn log_request_end(&mut self) {
        let Some(ctx) = self.ctx.clone() else {
            return;
        };

        let is_json = ctx
            .response_header(&CONTENT_TYPE)
            .and_then(|v| v.to_str().ok().map(|s| s.starts_with(APPLICATION_JSON)))
            .unwrap_or(false);
        let output = match (&self.exchange.response_body, is_json) {
            (Some(body), true) => body.to_string_lossy(),
            _ => String::new(),
        };
        let latency = self
            .exchange
            .started
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        self.emit_exchange("response", &ctx, output, latency, ctx.status().as_u16());
    }

    fn emit_exchange(
        &self,
        message: &str,
        ctx: &RequestContext,
        output: String,
        latency: u64,
        status: u16,
    ) {
        if !self.enabled(Level::INFO) {
            return;
        }
        let mut fields = self.base_fields();
        fields.insert("url".into(), json!(ctx.path()));
        fields.insert("input".into(), json!(self.exchange.request_body));
        fields.insert("output".into(), json!(output));
        fields.insert("latency".into(), json!(latency));
        fields.insert("status".into(), json!(status));
        self.sink.emit(&Record::new(Level::INFO, message, fields));
    }

    /// `logID`, context-derived ids and the field store, in that order.
    fn base_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(LOG_ID.into(), json!(log_id()));

        if let Some(ctx) = &self.ctx {
            for key in [SID, CUST_ID] {
                let value = ctx.get_string(key);
                if !value.is_empty() {
                    fields.insert(key.into(), Value::String(value));
                }
            }
        }

        for (key, value) in self.fields.iter() {
            fields.insert(key.into(), json!(value));
        }
        fields
    }
}

/// Returns a fresh logger with the same threshold and sink. Fields, the
/// request context and capture state are not carried over.
impl Clone for AppLogger {
    fn clone(&self) -> Self {
        Self {
            level: self.level,
            sink: Arc::clone(&self.sink),
            ctx: None,
            fields: FieldStore::new(),
            exchange: Exchange::default(),
        }
    }
}

impl std::fmt::Debug for AppLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppLogger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

/// Best-effort unique id: wall clock in Unix nanoseconds.
fn log_id() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::writer::{ResponseRecorder, ResponseWriter};
    use crate::logger::sink::MemorySink;
    use axum::http::{HeaderValue, Request, StatusCode};
    use std::collections::HashMap;
    use std::io;
    use std::time::Duration;

    fn logger(level: &str) -> (AppLogger, MemorySink) {
        let sink = MemorySink::new();
        (AppLogger::with_sink(level, Arc::new(sink.clone())), sink)
    }

    fn request(content_type: &str, body: &'static str) -> (RequestContext, ResponseRecorder) {
        let recorder = ResponseRecorder::new();
        let req = Request::builder()
            .method("POST")
            .uri("/orders?id=1")
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .unwrap();
        (RequestContext::from_request(req, recorder.clone()), recorder)
    }

    struct BrokenBody;

    impl Read for BrokenBody {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client hung up"))
        }
    }

    /// Serialization always fails.
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _s: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("nope"))
        }
    }

    #[test]
    fn test_invalid_level_constructs() {
        for level in ["", "LOUD", "inf0"] {
            let (log, _) = logger(level);
            assert_eq!(log.level(), LevelFilter::INFO);
        }
    }

    #[test]
    fn test_leveled_record_shape() {
        let (mut log, sink) = logger("DEBUG");
        log.with_field(FieldKey::AppName, "TestApp");

        log.info("[INFO]", 12345, "main", "Hello world!");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.level, Level::INFO);
        assert_eq!(rec.message, "[INFO]");
        assert!(rec.get("logID").unwrap().as_i64().unwrap() > 0);
        assert_eq!(rec.get_str("appName"), Some("TestApp"));
        assert_eq!(rec.get("refID"), Some(&json!(12345)));
        assert_eq!(rec.get_str("serviceName"), Some("main"));
        assert_eq!(rec.get_str("result"), Some("Hello world!"));
        assert!(rec.get("sid").is_none());
    }

    #[test]
    fn test_structured_result_is_serialized() {
        let (log, sink) = logger("INFO");
        let mut result = HashMap::new();
        result.insert("code", 7);

        log.error("failed", "ref-1", "billing", &result);

        assert_eq!(sink.records()[0].get("result"), Some(&json!({"code": 7})));
    }

    #[test]
    fn test_serialization_failure_falls_back_to_null() {
        let (log, sink) = logger("INFO");
        log.warn("odd", Unserializable, "svc", Unserializable);

        let rec = &sink.records()[0];
        assert_eq!(rec.get("refID"), Some(&Value::Null));
        assert_eq!(rec.get("result"), Some(&Value::Null));
    }

    #[test]
    fn test_threshold_filters_records() {
        let (log, sink) = logger("WARN");

        log.debug("d", 1, "svc", ());
        log.info("i", 1, "svc", ());
        assert!(sink.is_empty());

        log.warn("w", 1, "svc", ());
        log.error("e", 1, "svc", ());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_field_overwrite() {
        let (mut log, sink) = logger("INFO");
        log.with_field("appName", "A").with_field(FieldKey::AppName, "B");

        log.info("m", 1, "svc", ());

        let rec = &sink.records()[0];
        assert_eq!(rec.get_str("appName"), Some("B"));
        assert_eq!(rec.fields.keys().filter(|k| *k == "appName").count(), 1);
    }

    #[test]
    fn test_clone_resets_state() {
        let (mut log, sink) = logger("DEBUG");
        let (ctx, _) = request("application/json", "{}");
        ctx.set(SID, "s-1");
        log.with_field(FieldKey::AppName, "X").with_context(ctx);
        log.log_request_start();

        let mut fresh = log.clone();
        assert_eq!(fresh.level(), LevelFilter::DEBUG);
        assert!(fresh.fields().is_empty());
        assert!(fresh.context().is_none());

        sink.clear();
        fresh.debug("child", 2, "svc", ());
        fresh.log_request_end();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].get("appName").is_none());
        assert!(records[0].get("sid").is_none());
    }

    #[test]
    fn test_context_ids_are_included_when_present() {
        let (mut log, sink) = logger("INFO");
        let (ctx, _) = request("application/json", "{}");
        ctx.set(SID, "session-9");
        ctx.set(CUST_ID, "");
        log.with_context(ctx);

        log.info("m", 1, "svc", ());

        let rec = &sink.records()[0];
        assert_eq!(rec.get_str("sid"), Some("session-9"));
        assert!(rec.get("custID").is_none());
    }

    #[test]
    fn test_clear_context_drops_request_fields() {
        let (mut log, sink) = logger("INFO");
        let (ctx, recorder) = request("application/json", "{}");
        ctx.set(SID, "session-9");
        ctx.set(CUST_ID, "cust-3");
        log.with_context(ctx.clone());
        log.log_request_start();

        log.clear_context();
        assert!(log.context().is_none());
        log.info("m", 1, "svc", ());

        ctx.insert_response_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        ctx.write_all(b"{}").unwrap();
        log.log_request_end();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "request");
        assert_eq!(records[0].get_str("sid"), Some("session-9"));
        assert_eq!(records[1].message, "m");
        assert!(records[1].get("sid").is_none());
        assert!(records[1].get("custID").is_none());
        assert_eq!(&recorder.body()[..], b"{}");
    }

    #[test]
    fn test_request_start_captures_body_and_restores_it() {
        let (mut log, sink) = logger("INFO");
        let (ctx, _) = request("application/json", r#"{"amount":10}"#);
        log.with_context(ctx.clone());

        log.log_request_start();

        let rec = &sink.records()[0];
        assert_eq!(rec.message, "request");
        assert_eq!(rec.get_str("url"), Some("/orders"));
        assert_eq!(rec.get_str("input"), Some(r#"{"amount":10}"#));
        assert_eq!(rec.get_str("output"), Some(""));
        assert_eq!(rec.get("latency"), Some(&json!(0)));
        assert_eq!(rec.get("status"), Some(&json!(0)));

        assert_eq!(ctx.read_body().unwrap(), br#"{"amount":10}"#);
    }

    #[test]
    fn test_request_start_skips_multipart_body() {
        let (mut log, sink) = logger("INFO");
        let (ctx, _) = request("multipart/form-data; boundary=x", "--x\r\nfile\r\n--x--");
        log.with_context(ctx.clone());

        log.log_request_start();

        assert_eq!(sink.records()[0].get_str("input"), Some(""));
        assert_eq!(ctx.read_body().unwrap(), b"--x\r\nfile\r\n--x--");
    }

    #[test]
    fn test_request_body_read_error_is_swallowed() {
        let (mut log, sink) = logger("INFO");
        let (ctx, _) = request("text/plain", "");
        ctx.set_body(BrokenBody);
        log.with_context(ctx.clone());

        log.log_request_start();

        assert_eq!(sink.records()[0].get_str("input"), Some(""));
        assert!(ctx.has_body());
    }

    #[test]
    fn test_json_response_is_captured_and_passed_through() {
        let (mut log, sink) = logger("INFO");
        let (ctx, recorder) = request("application/json", "{}");
        log.with_context(ctx.clone());
        log.log_request_start();

        ctx.insert_response_header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        ctx.set_status(StatusCode::CREATED);
        ctx.write_all(b"abc").unwrap();
        ctx.write_all(b"def").unwrap();
        log.log_request_end();

        let rec = &sink.records()[1];
        assert_eq!(rec.message, "response");
        assert_eq!(rec.get_str("input"), Some("{}"));
        assert_eq!(rec.get_str("output"), Some("abcdef"));
        assert_eq!(rec.get("status"), Some(&json!(201)));
        assert_eq!(&recorder.body()[..], b"abcdef");
        assert_eq!(recorder.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_non_json_response_output_is_empty() {
        let (mut log, sink) = logger("INFO");
        let (ctx, recorder) = request("text/plain", "ping");
        log.with_context(ctx.clone());
        log.log_request_start();

        ctx.insert_response_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        ctx.write_all(b"pong").unwrap();
        log.log_request_end();

        assert_eq!(sink.records()[1].get_str("output"), Some(""));
        assert_eq!(&recorder.body()[..], b"pong");
    }

    #[test]
    fn test_latency_is_elapsed_millis() {
        let (mut log, sink) = logger("INFO");
        let (ctx, _) = request("application/json", "{}");
        log.with_context(ctx);

        log.log_request_start();
        std::thread::sleep(Duration::from_millis(30));
        log.log_request_end();

        let latency = sink.records()[1].get("latency").unwrap().as_u64().unwrap();
        assert!((30..1000).contains(&latency), "latency was {latency}");
    }

    #[test]
    fn test_request_end_without_context_is_noop() {
        let (mut log, sink) = logger("DEBUG");
        log.log_request_end();
        log.log_request_start();
        log.log_request_end();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_exchange_records_respect_threshold() {
        let (mut log, sink) = logger("ERROR");
        let (ctx, recorder) = request("application/json", "{}");
        log.with_context(ctx.clone());

        log.log_request_start();
        ctx.write_all(b"{}").unwrap();
        log.log_request_end();

        assert!(sink.is_empty());
        assert_eq!(&recorder.body()[..], b"{}");
    }

    #[test]
    fn test_from_config_applies_static_fields() {
        let mut config = LoggerConfig::default();
        config.level = "debug".into();
        config.app_name = Some("orders".into());
        config.fields.insert("region".into(), "eu-1".into());

        let log = AppLogger::from_config(&config);
        assert_eq!(log.level(), LevelFilter::DEBUG);
        assert_eq!(log.fields().get("appName"), Some("orders"));
        assert_eq!(log.fields().get("region"), Some("eu-1"));
    }
}
