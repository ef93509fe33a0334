//! Error types for ibank data handling

use thiserror::Error;

/// Result type alias using ibank Error
pub type Result<T> = std::result::Result<T, Error>;

/// ibank data error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Cannot parse balance from '{text}': {reason}")]
    Parse { text: String, reason: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl Error {
    pub(crate) fn parse(text: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}
