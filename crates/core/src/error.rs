//! Error types for the data layer
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Transport failures are *data*: they surface as the `rejected` arm of an
//! operation state machine and are never rethrown to the caller. Programmer
//! errors (an unregistered model or service reached from the relation
//! resolver) are not represented here — they panic at first use, since they
//! indicate a broken data-model declaration rather than a runtime condition.

use thiserror::Error;

/// Result type alias for data-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the data layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend/network failure, surfaced through a rejected operation
    #[error("transport error: {message}")]
    Transport {
        /// HTTP-style status code, when the backend produced one
        status: Option<u16>,
        /// Human-readable failure description
        message: String,
    },

    /// Response payload could not be interpreted
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A model name was looked up but never registered
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// A service key was looked up but never registered
    #[error("unknown service: {0}")]
    UnknownService(String),
}

impl Error {
    /// Build a transport error without a status code
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Build a transport error carrying a backend status code
    pub fn transport_status(status: u16, message: impl Into<String>) -> Self {
        Error::Transport {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
