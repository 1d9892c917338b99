//! Structured logging setup
//!
//! The library only emits `tracing` events; applications decide whether and
//! how to print them. [`init_logging`] installs a `tracing-subscriber` fmt
//! subscriber. `RUST_LOG` takes precedence over the configured level.
//!
//! ```rust,no_run
//! use eit_quadpole::logging::{init_logging, LogConfig, LogLevel};
//!
//! init_logging(&LogConfig {
//!     level: LogLevel::Debug,
//!     ..LogConfig::default()
//! });
//! tracing::info!(configurations = 512, "starting");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(level)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Default single-line format with timestamps and targets
    #[default]
    Full,
    /// Compact format (minimal, one line per event)
    Compact,
    /// Multi-line, human-readable format
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Log level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Directive filter overriding `level` (e.g. `"eit_quadpole=debug"`)
    pub filter: Option<String>,
}

impl LogConfig {
    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

/// Install the global logging subscriber
///
/// Returns `false` if a subscriber was already installed; the existing one
/// stays in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(config.env_filter());
    let result = match config.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_config_from_json() {
        let config: LogConfig =
            serde_json::from_str(r#"{"level": "debug", "format": "compact"}"#).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.filter, None);
    }

    #[test]
    fn test_config_defaults() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_second_init_is_ignored() {
        let config = LogConfig {
            level: LogLevel::Error,
            ..LogConfig::default()
        };
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
