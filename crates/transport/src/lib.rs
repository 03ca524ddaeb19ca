//! HTTP transport for the CouchDB client.
//!
//! A [`Connection`] pairs a base URL and a default timeout with its own
//! `reqwest` client. Calls describe themselves as a [`Request`] (method,
//! [`Endpoint`] path, query pairs, headers, body, credentials, [`Deadline`])
//! and [`Connection::send`] turns any status of 400 or above into
//! [`Error::Server`] with the server's `error` and `reason` fields.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request formatting, credential headers, and response
//! decoding live here. Nothing in this crate knows what a database, a
//! document, or a feed is; the `client` and `feeds` crates supply the paths
//! and interpret the bodies.
//!
//! ## Authentication
//!
//! Credentials are attached by an [`Authenticator`], which only decorates the
//! outgoing request. [`BasicAuth`] and [`SessionCookie`] are provided; callers
//! may plug in their own.

pub mod auth;
pub mod connection;
pub mod endpoint;
pub mod error;

pub use auth::{Authenticator, BasicAuth, SessionCookie};
pub use connection::{read_json, Connection, Deadline, Request};
pub use endpoint::Endpoint;
pub use error::{Error, Result, ServerError};

pub use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
