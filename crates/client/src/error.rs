//! Client error type.

use model::{ConfigurationError, ShapeError};
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything a client call can fail with.
///
/// [`Error::Configuration`] and [`Error::Shape`] are raised before any
/// request is sent.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument or option was rejected up front.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A bulk collection failed validation.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// The request failed or the server answered with an error status.
    #[error(transparent)]
    Transport(#[from] transport::Error),

    /// The named database or document does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up, e.g. `database 'orders'`.
        what: String,
    },

    /// The server answered but did not acknowledge the operation.
    #[error("{operation} was not acknowledged by the server")]
    OperationFailed {
        /// The operation that failed.
        operation: &'static str,
    },

    /// The server does not implement the endpoint (e.g. `_membership` on 1.x).
    #[error("{operation} is not supported by this server")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },
}

impl Error {
    /// Returns `true` if the error is a 404 or a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Returns `true` for a 409 update conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_conflict())
    }
}
