//! Demo HTTP server.
//!
//! # Responsibilities
//! - Create the Axum Router with the demo handlers
//! - Wire up middleware (tracing, access log)
//! - Bind server to listener and shut down gracefully

use std::future::Future;

use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::context::RequestContext;
use crate::http::middleware::{access_log_middleware, AccessLog};
use crate::logger::fields::{CUST_ID, SID};

/// HTTP server exposing the demo routes behind the access log.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let access = AccessLog::from_config(&config.logger);
        let router = Self::build_router(access);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(access: AccessLog) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/echo", post(echo_handler))
            .route("/upload", post(upload_handler))
            .layer(middleware::from_fn_with_state(access, access_log_middleware))
            .layer(TraceLayer::new_for_http())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Echoes the JSON body. `sid` and `custID` found in the body are stored on
/// the request context so they show up on the response record.
async fn echo_handler(
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<Value>,
) -> Json<Value> {
    for key in [SID, CUST_ID] {
        if let Some(value) = body.get(key).and_then(Value::as_str) {
            ctx.set(key, value);
        }
    }
    Json(json!({ "echo": body }))
}

async fn upload_handler(mut multipart: Multipart) -> Response {
    let mut files = 0usize;
    let mut bytes = 0usize;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => match field.bytes().await {
                Ok(data) => {
                    files += 1;
                    bytes += data.len();
                }
                Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            },
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    }
    Json(json!({ "files": files, "bytes": bytes })).into_response()
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
