//! Subscriber setup for binaries and tools built on this crate.
//!
//! Library code logs through `log` and `tracing`; nothing is printed until a
//! caller installs a subscriber with [`init`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "CHOREO_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when neither environment variable is set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Unknown log format '{0}', expected 'pretty' or 'json'")]
    UnknownFormat(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("Failed to bridge log records into tracing: {0}")]
    LogBridge(String),
}

/// Builds the filter: `CHOREO_LOG`, then `RUST_LOG`, then the configured level.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber and forwards `log` records into it.
///
/// Fails if a subscriber or logger is already installed.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.map_err(|e| LoggingError::Subscriber(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| LoggingError::LogBridge(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(LoggingError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LogConfig = serde_yaml::from_str("format: json").unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_init_only_once() {
        let config = LogConfig::default();
        init(&config).unwrap();
        log::info!("bridged through tracing");
        assert!(matches!(init(&config), Err(LoggingError::Subscriber(_))));
    }
}
