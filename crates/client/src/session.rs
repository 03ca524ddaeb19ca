//! Cookie sessions.

use serde_json::Value;
use transport::{Authenticator, Endpoint, Request, SessionCookie};

use crate::error::Result;
use crate::server::Server;

/// A logged-in cookie session.
///
/// A `Session` is itself an [`Authenticator`]: wrap it in an `Arc` and pass
/// it to [`Server::database`] or [`Server::new`] to act as the session's user.
#[derive(Debug, Clone)]
pub struct Session {
    server: Server,
    cookie: SessionCookie,
}

impl Session {
    pub(crate) fn new(server: Server, cookie: SessionCookie) -> Self {
        Self { server, cookie }
    }

    /// The session cookie.
    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    /// Fetches the session document (`userCtx`, authentication info).
    pub async fn info(&self) -> Result<Value> {
        let request =
            Request::get(Endpoint::path("_session")).auth(Some(self as &dyn Authenticator));
        Ok(self.server.connection().send_json(request).await?)
    }

    /// Logs out, invalidating the cookie on the server.
    pub async fn close(self) -> Result<()> {
        let request =
            Request::delete(Endpoint::path("_session")).auth(Some(&self as &dyn Authenticator));
        self.server.connection().send(request).await?;
        Ok(())
    }
}

impl Authenticator for Session {
    fn decorate(&self, request: transport::RequestBuilder) -> transport::RequestBuilder {
        self.cookie.decorate(request)
    }
}
