//! The base connection and the requests sent over it.

use std::time::Duration;

use model::Options;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::Authenticator;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result, ServerError};

const APPLICATION_JSON: &str = "application/json";

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

/// How long a single request may take, from connect to the end of the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Deadline {
    /// The connection's configured timeout, if any.
    #[default]
    Default,
    /// An explicit bound for this request only.
    Custom(Duration),
    /// No bound. Used for continuous feeds, which end only when closed.
    Unbounded,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One request: method, path, query, headers, body, credentials, deadline.
#[derive(Debug)]
pub struct Request<'a> {
    method: Method,
    endpoint: Endpoint,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    auth: Option<&'a dyn Authenticator>,
    deadline: Deadline,
}

impl<'a> Request<'a> {
    /// Creates a request with no query, headers, body, or credentials.
    pub fn new(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            auth: None,
            deadline: Deadline::Default,
        }
    }

    /// A `GET` request.
    pub fn get(endpoint: Endpoint) -> Self {
        Self::new(Method::GET, endpoint)
    }

    /// A `HEAD` request.
    pub fn head(endpoint: Endpoint) -> Self {
        Self::new(Method::HEAD, endpoint)
    }

    /// A `PUT` request.
    pub fn put(endpoint: Endpoint) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    /// A `POST` request.
    pub fn post(endpoint: Endpoint) -> Self {
        Self::new(Method::POST, endpoint)
    }

    /// A `DELETE` request.
    pub fn delete(endpoint: Endpoint) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// A request with a non-standard method such as `COPY`.
    pub fn custom(method: &str, endpoint: Endpoint) -> Result<Self> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| Error::InvalidMethod {
            method: method.to_string(),
        })?;
        Ok(Self::new(method, endpoint))
    }

    /// Appends pre-rendered query pairs.
    #[must_use]
    pub fn query(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Appends a single query pair.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends every option as a query pair.
    #[must_use]
    pub fn options(self, options: &Options) -> Self {
        self.query(options.to_query())
    }

    /// Sets a header.
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
            name: name.to_string(),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Serialises `body` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        Ok(self)
    }

    /// Declares a JSON content type without a body, as some `POST`
    /// maintenance endpoints require.
    #[must_use]
    pub fn json_content_type(mut self) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self
    }

    /// Sets a raw body with its content type.
    pub fn body(self, content_type: &str, bytes: Vec<u8>) -> Result<Self> {
        let mut request = self.header(CONTENT_TYPE, content_type)?;
        request.body = Some(bytes);
        Ok(request)
    }

    /// Attaches credentials.
    #[must_use]
    pub fn auth(mut self, auth: Option<&'a dyn Authenticator>) -> Self {
        self.auth = auth;
        self
    }

    /// Overrides the connection's timeout for this request.
    #[must_use]
    pub fn deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A base URL, a default timeout, and the HTTP client that serves them.
///
/// A `Connection` holds no per-request state and may be shared freely.
/// Long-lived reads should run on their own copy from [`Connection::duplicate`]
/// so they never occupy the shared client's connection pool.
#[derive(Debug, Clone)]
pub struct Connection {
    base_url: Url,
    timeout: Option<Duration>,
    http: reqwest::Client,
}

impl Connection {
    /// Creates a connection to `url`.
    ///
    /// `timeout` bounds every request that does not set its own
    /// [`Deadline`]; `None` means requests are unbounded.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::CannotBeABase(url.to_string()));
        }
        Ok(Self {
            http: build_client(timeout)?,
            base_url,
            timeout,
        })
    }

    /// Returns a connection with the same settings and its own HTTP client.
    pub fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            http: build_client(self.timeout)?,
        })
    }

    /// The base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The default per-request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sends `request` and returns the response if its status is below 400.
    ///
    /// A status of 400 or above is turned into [`Error::Server`] carrying the
    /// server's error code and reason (not read for `HEAD`).
    pub async fn send(&self, request: Request<'_>) -> Result<Response> {
        let url = request.endpoint.url(&self.base_url)?;
        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        match request.deadline {
            Deadline::Default => {
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
            }
            Deadline::Custom(timeout) => builder = builder.timeout(timeout),
            Deadline::Unbounded => {}
        }
        if let Some(auth) = request.auth {
            builder = auth.decorate(builder);
        }

        let response = builder.send().await?;
        if response.status().as_u16() >= 400 {
            return Err(error_from_response(request.method, response).await);
        }
        Ok(response)
    }

    /// Sends `request` and decodes the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: Request<'_>) -> Result<T> {
        let response = self.send(request).await?;
        read_json(response).await
    }
}

// The client carries only a connect timeout; overall deadlines are applied
// per request so that feeds can opt out of them.
fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.connect_timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Reads the whole body of `response` and decodes it as JSON.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

async fn error_from_response(method: Method, response: Response) -> Error {
    let status = response.status();
    let url = response.url().to_string();

    if method == Method::HEAD {
        return ServerError {
            status,
            method,
            url,
            error: String::new(),
            reason: String::new(),
        }
        .into();
    }

    match response.json::<ErrorBody>().await {
        Ok(body) => ServerError {
            status,
            method,
            url,
            error: body.error,
            reason: body.reason,
        }
        .into(),
        Err(source) => Error::UndecodableError {
            status,
            method,
            url,
            source,
        },
    }
}
