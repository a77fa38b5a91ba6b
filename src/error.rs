//! Error types for acquisition and configuration

use thiserror::Error;

/// Failure reported by an analog acquisition collaborator.
///
/// The sampling loop cannot make progress without a sample, so any of these
/// ends the periodic task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("ADC conversion failed: {0}")]
    Conversion(String),

    #[error("analog source disconnected")]
    Disconnected,

    #[error("ADC buffer holds {got} samples, expected {expected}")]
    BufferSize { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
