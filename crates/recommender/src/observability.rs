//! Structured logging setup

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Build the filter: `RUST_LOG` wins, otherwise `default_level`
pub fn env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|e| LoggingError::InvalidFilter {
            filter: default_level.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(default_level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = env_filter(default_level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };

    result.map_err(|e| LoggingError::SubscriberInit(e.to_string()))
}
