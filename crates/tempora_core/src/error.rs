//! Core error types for TEMPORA.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Value could not be encoded
    InvalidEncoding,

    /// Timestamp outside the sortable layout
    InvalidTimestamp {
        /// What was wrong with it
        reason: String,
    },

    /// Malformed JSON input
    ParseError {
        /// Parser message
        message: String,
    },

    /// I/O failure underneath an encoder
    Io {
        /// Error message
        message: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEncoding => write!(f, "Invalid encoding"),
            Self::InvalidTimestamp { reason } => write!(f, "Invalid timestamp: {}", reason),
            Self::ParseError { message } => write!(f, "Parse error: {}", message),
            Self::Io { message } => write!(f, "I/O error: {}", message),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::Io {
                message: err.to_string(),
            }
        } else if err.is_syntax() || err.is_eof() {
            Self::ParseError {
                message: err.to_string(),
            }
        } else {
            Self::InvalidEncoding
        }
    }
}
