//! HTTP request/response boundary.
//!
//! # Data Flow
//! ```text
//! axum request
//!     → middleware/access_log.rs (buffer body, build RequestContext)
//!     → context.rs (headers, read-once body, key/value store, writer slot)
//!     → capture.rs (BodyCapture mirrors response bytes)
//!     → writer.rs (ResponseRecorder hands each chunk back to the body)
//!     → axum response (streamed)
//! ```
//!
//! # Design Decisions
//! - The logger only sees `RequestContext`, never axum types directly
//! - Request bodies are buffered in full; there is no size cap
//! - Response bodies are forwarded chunk by chunk; only the captured copy
//!   grows with the body

pub mod capture;
pub mod context;
pub mod middleware;
pub mod server;
pub mod writer;

pub use capture::{BodyCapture, CapturedBody};
pub use context::{RequestBody, RequestContext};
pub use middleware::{access_log_middleware, AccessLog};
pub use server::HttpServer;
pub use writer::{ResponseRecorder, ResponseWriter};
