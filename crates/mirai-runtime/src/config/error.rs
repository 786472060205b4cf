//! Errors raised while loading configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file named through [`ConfigLoader::file`](super::ConfigLoader::file)
    /// does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// figment could not read or extract a source, or the file format is
    /// not enabled.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Values deserialized but cannot be used, e.g. a zero pool size.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
