//! Database-scope operations: documents, views and changes.
//!
//! Bulk writes, maintenance, attachments and security live in their own
//! modules as further `impl Database` blocks.

use std::sync::Arc;

use feeds::{open_feed, Feed};
use model::feed::{continuous_query, one_shot_query};
use model::{
    DatabaseChanges, DatabaseEvent, DatabaseName, DbInfo, Destination, DocumentHead, DocumentId,
    Options, Revision, UpdateResult, ViewResult,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;
use transport::header::{HeaderName, CONTENT_LENGTH, ETAG};
use transport::{Authenticator, Connection, Endpoint, Request};

use crate::error::{Error, Result};
use crate::reply::{non_empty, written_revision, Ack};

pub(crate) const FULL_COMMIT: &str = "x-couch-full-commit";
const DESTINATION: &str = "destination";

/// A handle to one database.
///
/// Obtained from [`crate::Server::database`] and friends. Cloning is cheap
/// and clones share the server's HTTP client.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Connection,
    auth: Option<Arc<dyn Authenticator>>,
    name: DatabaseName,
}

impl Database {
    pub(crate) fn new(
        conn: Connection,
        auth: Option<Arc<dyn Authenticator>>,
        name: DatabaseName,
    ) -> Self {
        Self { conn, auth, name }
    }

    /// Returns the same database accessed with other credentials.
    #[must_use]
    pub fn with_auth(self, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            auth: Some(auth),
            ..self
        }
    }

    /// The database name.
    pub fn name(&self) -> &DatabaseName {
        &self.name
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn auth(&self) -> Option<&dyn Authenticator> {
        self.auth.as_deref()
    }

    /// `/{db}`.
    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint::path(&self.name)
    }

    /// `/{db}/{docid}`.
    pub(crate) fn document(&self, id: &str) -> Result<Endpoint> {
        Ok(self.endpoint().document(non_empty(id, "document id")?))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: Request<'_>) -> Result<T> {
        Ok(self.conn.send_json(request.auth(self.auth())).await?)
    }

    // -----------------------------------------------------------------------
    // Database
    // -----------------------------------------------------------------------

    /// Fetches database information.
    pub async fn info(&self) -> Result<DbInfo> {
        self.send_json(Request::get(self.endpoint())).await
    }

    /// Deletes the database and every document in it.
    pub async fn delete(self) -> Result<()> {
        let ack: Ack = self.send_json(Request::delete(self.endpoint())).await?;
        ack.require("delete database")
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Creates a document and returns its id and revision.
    ///
    /// Without an `_id` in `doc` the server assigns one. With `batch` the
    /// server acknowledges before writing and returns no revision.
    /// `full_commit` forces the write to disk before the server answers.
    pub async fn insert<T: Serialize + ?Sized>(
        &self,
        doc: &T,
        batch: bool,
        full_commit: bool,
    ) -> Result<(DocumentId, Option<Revision>)> {
        let mut request = Request::post(self.endpoint()).json(doc)?;
        if batch {
            request = request.param("batch", "ok");
        }
        if full_commit {
            request = request.header(HeaderName::from_static(FULL_COMMIT), "true")?;
        }
        let result: UpdateResult = self.send_json(request).await?;
        if result.error.is_some() {
            return Err(Error::OperationFailed { operation: "insert" });
        }
        Ok((result.id, result.rev))
    }

    /// Fetches a document. `options` may ask for a revision (`rev`),
    /// conflicts, attachments and so on.
    pub async fn get<T: DeserializeOwned>(
        &self,
        id: impl AsRef<str>,
        options: &Options,
    ) -> Result<T> {
        let endpoint = self.document(id.as_ref())?;
        self.send_json(Request::get(endpoint).options(options)).await
    }

    /// Creates or updates the document `id` and returns its new revision.
    ///
    /// Updating requires `doc` to carry the current `_rev`; otherwise the
    /// server answers 409.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        id: impl AsRef<str>,
        doc: &T,
    ) -> Result<Revision> {
        let endpoint = self.document(id.as_ref())?;
        let result: UpdateResult = self.send_json(Request::put(endpoint).json(doc)?).await?;
        written_revision(result, "put")
    }

    /// Deletes revision `rev` of document `id` and returns the tombstone's
    /// revision.
    pub async fn del(&self, id: impl AsRef<str>, rev: &Revision) -> Result<Revision> {
        let endpoint = self.document(id.as_ref())?;
        let request = Request::delete(endpoint).param("rev", rev);
        let result: UpdateResult = self.send_json(request).await?;
        written_revision(result, "del")
    }

    /// Checks whether a document exists without fetching its body.
    ///
    /// Returns `None` for a missing document.
    pub async fn exists(
        &self,
        id: impl AsRef<str>,
        options: &Options,
    ) -> Result<Option<DocumentHead>> {
        let endpoint = self.document(id.as_ref())?;
        let request = Request::head(endpoint).options(options).auth(self.auth());
        let response = match self.conn.send(request).await {
            Ok(response) => response,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let headers = response.headers();
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or(transport::Error::MissingHeader { name: "Content-Length" })?;
        let rev = headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Revision::new(v.trim_matches('"')))
            .ok_or(transport::Error::MissingHeader { name: "ETag" })?;
        Ok(Some(DocumentHead { size, rev }))
    }

    /// Copies document `id` to `destination` and returns the new revision
    /// of the target.
    pub async fn copy(
        &self,
        id: impl AsRef<str>,
        destination: &Destination,
        options: &Options,
    ) -> Result<Revision> {
        let endpoint = self.document(id.as_ref())?;
        let request = Request::custom("COPY", endpoint)?
            .options(options)
            .header(HeaderName::from_static(DESTINATION), &destination.header_value())?;
        let result: UpdateResult = self.send_json(request).await?;
        written_revision(result, "copy")
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Lists documents through the built-in `_all_docs` view.
    pub async fn all_docs(&self, options: &Options) -> Result<ViewResult> {
        let request = Request::get(self.endpoint().segment("_all_docs")).options(options);
        self.send_json(request).await
    }

    /// Lists the documents with the given ids, in that order.
    pub async fn all_docs_by_ids(&self, keys: &[&str], options: &Options) -> Result<ViewResult> {
        let request = Request::post(self.endpoint().segment("_all_docs"))
            .options(options)
            .json(&json!({ "keys": keys }))?;
        self.send_json(request).await
    }

    // -----------------------------------------------------------------------
    // Changes
    // -----------------------------------------------------------------------

    /// Fetches changes in a single request.
    ///
    /// `feed=continuous` is rejected before any request; use
    /// [`Database::changes_feed`]. `longpoll` is passed through.
    pub async fn all_changes(&self, options: &Options) -> Result<DatabaseChanges> {
        let query = one_shot_query("all_changes", options)?;
        let request = Request::get(self.endpoint().segment("_changes")).query(query);
        self.send_json(request).await
    }

    /// Opens a continuous feed of document changes.
    ///
    /// Every option except `feed` is forwarded (`since`, `include_docs`,
    /// `heartbeat`, `filter`, ...). A `feed` option other than `continuous`
    /// is rejected before any request.
    #[instrument(skip_all, fields(db = %self.name))]
    pub async fn changes_feed(&self, options: &Options) -> Result<Feed<DatabaseEvent>> {
        let query = continuous_query("changes_feed", options)?;
        let request = Request::get(self.endpoint().segment("_changes"))
            .query(query)
            .auth(self.auth());
        Ok(open_feed(&self.conn, request).await?)
    }
}
