//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so an empty file is a valid configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logger::fields::{FieldKey, CUST_ID, SID};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Logger settings.
    pub logger: LoggerConfig,

    /// Demo server settings.
    pub server: ServerConfig,
}

/// Where emitted records go.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines on stdout.
    Stdout,
    /// Events on the global `tracing` dispatcher.
    Tracing,
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Verbosity threshold (e.g., "DEBUG", "info"). Unknown names mean INFO.
    pub level: String,

    /// Record destination.
    pub output: OutputKind,

    /// Attached as `appName` on every record.
    pub app_name: Option<String>,

    /// Attached as `serviceName` on every record.
    pub service_name: Option<String>,

    /// Extra static fields attached to every record.
    pub fields: BTreeMap<String, String>,

    /// Request header name → context key copied before the request record.
    pub context_headers: BTreeMap<String, String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let mut context_headers = BTreeMap::new();
        context_headers.insert("x-session-id".to_string(), SID.to_string());
        context_headers.insert("x-customer-id".to_string(), CUST_ID.to_string());

        Self {
            level: "INFO".to_string(),
            output: OutputKind::default(),
            app_name: None,
            service_name: None,
            fields: BTreeMap::new(),
            context_headers,
        }
    }
}

impl LoggerConfig {
    /// Fields every logger built from this config starts with.
    pub fn static_fields(&self) -> Vec<(FieldKey, String)> {
        let mut out = Vec::new();
        if let Some(name) = &self.app_name {
            out.push((FieldKey::AppName, name.clone()));
        }
        if let Some(name) = &self.service_name {
            out.push((FieldKey::ServiceName, name.clone()));
        }
        for (key, value) in &self.fields {
            out.push((FieldKey::from(key.as_str()), value.clone()));
        }
        out
    }
}

/// Demo server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}
