//! # logger: process-wide tracing setup
//!
//! Installs the global `tracing` subscriber exactly once at startup.
//! The level acts as a default directive, so `RUST_LOG` can still
//! sharpen the filter per target.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log level {0:?}")]
    InvalidLevel(String),
    #[error("could not install log subscriber: {0}")]
    Init(String),
}

/// Parse a level name such as `info` or `DEBUG`.
pub fn parse_level(level: &str) -> Result<Level, LoggerError> {
    level
        .parse::<Level>()
        .map_err(|_| LoggerError::InvalidLevel(level.to_owned()))
}

/// Install the global subscriber. Fails if the level is unknown or a
/// subscriber is already installed.
pub fn init(level: &str, format: LogFormat) -> Result<(), LoggerError> {
    let level = parse_level(level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|err| LoggerError::Init(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(parse_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("warn").unwrap(), Level::WARN);
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(matches!(
            parse_level("loud"),
            Err(LoggerError::InvalidLevel(_))
        ));
    }

    #[test]
    fn init_rejects_unknown_level_before_installing() {
        assert!(matches!(
            init("loud", LogFormat::Text),
            Err(LoggerError::InvalidLevel(_))
        ));
    }
}
