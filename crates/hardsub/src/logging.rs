//! Process-wide log setup. The library itself only emits `log` and `tracing`
//! records; binaries call [`init_tracing`] once.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Logging is already initialized: {0}")]
    AlreadyInitialized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `RUST_LOG` when set, otherwise `default_filter`.
pub fn build_filter(default_filter: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    parse_filter(default_filter)
}

pub fn parse_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(filter).map_err(|e| LoggingError::Filter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Installs a stderr fmt subscriber and routes `log` records into it.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = build_filter(default_filter)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("hardsub=debug,warn").is_ok());
        assert!(matches!(
            parse_filter("hardsub=loudest"),
            Err(LoggingError::Filter { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_init_only_once() {
        assert!(init_tracing("debug", LogFormat::Text).is_ok());
        assert!(matches!(
            init_tracing("debug", LogFormat::Json),
            Err(LoggingError::AlreadyInitialized(_))
        ));
        log::info!("bridged through tracing-log");
    }
}
