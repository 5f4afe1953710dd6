//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → AppConfig (immutable)
//!     → AppLogger::from_config / AccessLog::new
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Errors surface only when loading, never from logging calls

pub mod loader;
pub mod schema;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AppConfig;
pub use schema::LoggerConfig;
pub use schema::OutputKind;
pub use schema::ServerConfig;
