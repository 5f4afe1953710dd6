//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use app_logger::http::{AccessLog, HttpServer};
use app_logger::logger::{AppLogger, FieldKey, MemorySink, Record};
use axum::Router;
use tokio::net::TcpListener;

/// Access log writing into memory, tagged with `appName = "test-app"`.
pub fn memory_access_log(level: &str) -> (AccessLog, MemorySink) {
    let sink = MemorySink::new();
    let mut template = AppLogger::with_sink(level, Arc::new(sink.clone()));
    template.with_field(FieldKey::AppName, "test-app");
    let access = AccessLog::new(template)
        .with_context_headers([("x-session-id", "sid"), ("x-customer-id", "custID")]);
    (access, sink)
}

/// Serve the demo router on an ephemeral port.
pub async fn start_server(access: AccessLog) -> SocketAddr {
    serve(HttpServer::build_router(access)).await
}

/// Serve `router` on an ephemeral port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    addr
}

/// Records in `sink` once it holds at least `n` of them (or after ~1s).
///
/// The response record is written when the server finishes the body, which
/// can trail the client reading it.
pub async fn wait_for_records(sink: &MemorySink, n: usize) -> Vec<Record> {
    for _ in 0..100 {
        if sink.len() >= n {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sink.records()
}
