//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse {path:?}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A `JSPROC_*` variable holds a value of the wrong type
    #[error("Environment variable error: {0}")]
    EnvError(String),

    #[error("Invalid {domain} configuration: {message}")]
    DomainError { domain: String, message: String },
}
