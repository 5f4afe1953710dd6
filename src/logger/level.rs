//! Verbosity threshold parsing.

use tracing::level_filters::LevelFilter;

/// Threshold used when a level string cannot be parsed.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Parse a severity name into a threshold (case-insensitive).
///
/// Accepts the conventional names plus the `dpanic`/`panic`/`fatal` aliases,
/// which all map to `ERROR`.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "dpanic" | "panic" | "fatal" => Some(LevelFilter::ERROR),
        "off" | "none" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Parse a severity name, falling back to [`DEFAULT_LEVEL`].
pub fn level_or_default(s: &str) -> LevelFilter {
    match parse_level(s) {
        Some(level) => level,
        None => {
            tracing::warn!(input = %s, fallback = %DEFAULT_LEVEL, "Unrecognized log level");
            DEFAULT_LEVEL
        }
    }
}
