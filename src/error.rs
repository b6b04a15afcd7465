//! Error types for DrishtiSeg

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DrishtiSeg error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier model could not be loaded (fatal at startup)
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Observation or sensor-origin fetch did not succeed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Malformed wire message
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Protocol(e.to_string())
    }
}
