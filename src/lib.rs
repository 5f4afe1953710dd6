//! Contextual logging for HTTP services.
//!
//! An [`AppLogger`] emits structured JSON records decorated with its own
//! fields and with values from the request it is attached to. The
//! [`access_log_middleware`](http::access_log_middleware) drives a fresh
//! logger per request and records the request and response bodies.

pub mod config;
pub mod http;
pub mod logger;
pub mod util;

pub use config::AppConfig;
pub use http::{HttpServer, RequestContext};
pub use logger::{AppLogger, FieldKey};
