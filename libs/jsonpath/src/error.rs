//! Error types for JSONPath parsing

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// JSONPath parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Parse error at position {position}: {message}")]
    Parse { message: String, position: usize },
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        Error::Parse {
            message: message.into(),
            position,
        }
    }

    /// The human-readable message without the position prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Parse { message, .. } => message,
        }
    }
}
