use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for writer construction.
pub type Result<T> = std::result::Result<T, WriterError>;

/// Errors raised while reading writer configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required property '{0}' for writer")]
    MissingKey(&'static str),

    #[error("Invalid value '{value}' for property '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top level writer error
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create log directory at {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<WriterError> for io::Error {
    fn from(err: WriterError) -> Self {
        match err {
            WriterError::Io(e) => e,
            WriterError::CreateDirectory { source, .. } => source,
            WriterError::Config(e) => io::Error::new(io::ErrorKind::InvalidInput, e),
        }
    }
}
