//! Transport failures.

use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A non-success response, with the server's own error code and reason.
///
/// `error` and `reason` are empty for `HEAD` requests, which carry no body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {method} {url} - {error} {reason}")]
pub struct ServerError {
    /// HTTP status (always >= 400).
    pub status: StatusCode,
    /// Method of the failed request.
    pub method: Method,
    /// Full URL of the failed request.
    pub url: String,
    /// Server error code, e.g. `"not_found"` or `"conflict"`.
    pub error: String,
    /// Server explanation, e.g. `"missing"`.
    pub reason: String,
}

/// Errors raised while sending a request or reading its response.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with status >= 400.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The server answered with status >= 400 and a body that is not a
    /// server error document.
    #[error("unknown error accessing server: {status}: {method} {url}: {source}")]
    UndecodableError {
        /// HTTP status.
        status: StatusCode,
        /// Method of the failed request.
        method: Method,
        /// Full URL of the failed request.
        url: String,
        /// Why the body could not be read or decoded.
        source: reqwest::Error,
    },

    /// A success response body was not the expected JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The base URL or a derived URL is malformed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry a path (e.g. `mailto:`).
    #[error("url '{0}' cannot be used as a base")]
    CannotBeABase(String),

    /// A header value contains characters HTTP does not allow.
    #[error("invalid value for header {name}")]
    InvalidHeader {
        /// Header name.
        name: String,
    },

    /// A response header the caller depends on is absent or malformed.
    #[error("response header {name} is missing or malformed")]
    MissingHeader {
        /// Header name.
        name: &'static str,
    },

    /// A custom method name is not a valid HTTP token.
    #[error("invalid http method '{method}'")]
    InvalidMethod {
        /// The rejected method name.
        method: String,
    },
}

impl Error {
    /// The HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server(e) => Some(e.status),
            Self::UndecodableError { status, .. } => Some(*status),
            Self::Request(e) => e.status(),
            _ => None,
        }
    }

    /// Returns `true` for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns `true` for a 409 response.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}
