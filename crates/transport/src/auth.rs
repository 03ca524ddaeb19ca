//! Credentials attached to outgoing requests.
//!
//! An [`Authenticator`] only decorates a request; choosing a scheme, logging
//! in, and refreshing sessions are the caller's business. Two schemes are
//! provided:
//!
//! - [`BasicAuth`]: `Authorization: Basic base64(user:password)` (RFC 7617).
//! - [`SessionCookie`]: the `AuthSession` cookie issued by `POST /_session`.

use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderMap, AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::RequestBuilder;

/// Adds credentials to an outgoing request.
pub trait Authenticator: std::fmt::Debug + Send + Sync {
    /// Returns `request` with credential headers attached.
    fn decorate(&self, request: RequestBuilder) -> RequestBuilder;
}

// ---------------------------------------------------------------------------

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Creates Basic credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The user name.
    pub fn username(&self) -> &str {
        &self.username
    }

    fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(credentials.as_bytes()))
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Authenticator for BasicAuth {
    fn decorate(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, self.header_value())
    }
}

// ---------------------------------------------------------------------------

const SESSION_COOKIE: &str = "AuthSession";

/// The session token issued by the server's cookie authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    token: String,
}

impl SessionCookie {
    /// Wraps a raw `AuthSession` token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Extracts the `AuthSession` token from `Set-Cookie` response headers.
    ///
    /// Returns `None` when the headers carry no non-empty `AuthSession`
    /// cookie (the server clears it with an empty value on logout).
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
            .find(|token| !token.is_empty())
            .map(Self::new)
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Authenticator for SessionCookie {
    fn decorate(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(COOKIE, format!("{SESSION_COOKIE}={}", self.token))
    }
}
