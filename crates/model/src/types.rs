//! Request and response bodies for the request/response endpoints.
//!
//! Field names follow the server's JSON. Fields that only some server
//! versions send are `Option`s or default to empty, so the same types decode
//! 1.x and 2.x+ responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::{AttachmentName, DocumentId, Revision, Sequence};
use crate::options::Options;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Welcome document returned by `GET /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Greeting, always `"Welcome"`.
    pub couchdb: String,
    /// Server instance uuid (absent on some 2.x+ builds).
    #[serde(default)]
    pub uuid: Option<String>,
    /// Vendor block, free-form.
    #[serde(default)]
    pub vendor: Option<Value>,
    /// Server version string.
    pub version: String,
}

/// Outcome of `POST /_replicate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationResult {
    /// Whether the replication request succeeded.
    #[serde(default)]
    pub ok: bool,
    /// Per-session replication history, free-form.
    #[serde(default)]
    pub history: Vec<Map<String, Value>>,
    /// Replication protocol version.
    #[serde(default)]
    pub replication_id_version: Option<u32>,
    /// Unique id of this replication session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Last source sequence replicated.
    #[serde(default)]
    pub source_last_seq: Option<Sequence>,
    /// Set when the source had nothing new to replicate.
    #[serde(default)]
    pub no_changes: bool,
}

/// A user document for the `_users` database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Login name.
    pub name: String,
    /// Document type; always `"user"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Roles granted to the user.
    pub roles: Vec<String>,
    /// Plain-text password; the server hashes it on write.
    pub password: String,
}

impl UserRecord {
    /// Creates a user record with no roles.
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "user".to_string(),
            roles: Vec::new(),
            password: password.into(),
        }
    }

    /// The `_users` document id for this user.
    pub fn document_id(&self) -> String {
        format!("org.couchdb.user:{}", self.name)
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Database information returned by `GET /{db}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbInfo {
    /// Database name.
    pub db_name: String,
    /// Number of live documents.
    #[serde(default)]
    pub doc_count: u64,
    /// Number of deleted documents.
    #[serde(default)]
    pub doc_del_count: u64,
    /// Current update sequence.
    pub update_seq: Sequence,
    /// Current purge sequence.
    #[serde(default)]
    pub purge_seq: Option<Sequence>,
    /// Whether compaction is running.
    #[serde(default)]
    pub compact_running: bool,
    /// On-disk size in bytes (1.x).
    #[serde(default)]
    pub disk_size: Option<u64>,
    /// Live data size in bytes (1.x).
    #[serde(default)]
    pub data_size: Option<u64>,
    /// On-disk format version.
    #[serde(default)]
    pub disk_format_version: Option<u32>,
    /// Instance start time, microseconds since the epoch as a string.
    #[serde(default)]
    pub instance_start_time: Option<String>,
    /// Sequence of the last committed update (1.x).
    #[serde(default)]
    pub committed_update_seq: Option<Sequence>,
}

/// One row of a view or `_all_docs` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    /// Id of the emitting document; absent for reduced rows.
    #[serde(default)]
    pub id: Option<DocumentId>,
    /// Row key.
    #[serde(default)]
    pub key: Value,
    /// Row value.
    #[serde(default)]
    pub value: Value,
    /// Full document when `include_docs=true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
    /// Per-key error (e.g. `"not_found"` for `_all_docs` with `keys`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A view or `_all_docs` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewResult {
    /// Total number of rows in the view, before `limit`/`skip`.
    #[serde(default)]
    pub total_rows: Option<u64>,
    /// Offset of the first returned row.
    #[serde(default)]
    pub offset: Option<u64>,
    /// The rows.
    pub rows: Vec<ViewRow>,
    /// Update sequence when `update_seq=true`.
    #[serde(default)]
    pub update_seq: Option<Sequence>,
}

/// Per-document outcome of a bulk or single write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// The document id.
    pub id: DocumentId,
    /// The new revision, when the write succeeded.
    #[serde(default)]
    pub rev: Option<Revision>,
    /// Whether the write succeeded.
    #[serde(default)]
    pub ok: bool,
    /// Error code when the write failed (e.g. `"conflict"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error detail when the write failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl UpdateResult {
    /// Returns `true` if this record was written.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (self.ok || self.rev.is_some())
    }
}

/// Outcome of `POST /{db}/_purge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurgeResult {
    /// Purge sequence after the request (null on 2.x+).
    #[serde(default)]
    pub purge_seq: Option<Sequence>,
    /// Purged revisions per document id.
    pub purged: BTreeMap<String, Vec<String>>,
}

/// Revisions per document id, as sent to `_purge`, `_missing_revs` and
/// `_revs_diff`.
pub type RevisionMap = BTreeMap<String, Vec<String>>;

/// Response body of `POST /{db}/_missing_revs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingRevs {
    /// Revisions the database does not have, per document id.
    #[serde(default)]
    pub missing_revs: RevisionMap,
}

/// One entry of a `POST /{db}/_revs_diff` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevsDiffEntry {
    /// Revisions the database does not have.
    #[serde(default)]
    pub missing: Vec<String>,
    /// Stored revisions that could be ancestors of the missing ones.
    #[serde(default)]
    pub possible_ancestors: Vec<String>,
}

/// What `HEAD /{db}/{docid}` reveals about a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHead {
    /// Size of the document body in bytes.
    pub size: u64,
    /// Current revision, from the `ETag` header.
    pub rev: Revision,
}

/// Target of a `COPY` request.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// Id of the target document.
    pub id: DocumentId,
    /// Extra parameters, typically `rev` when overwriting an existing target.
    pub options: Options,
}

impl Destination {
    /// Copies to a new document.
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            options: Options::new(),
        }
    }

    /// Copies over an existing document at `rev`.
    pub fn overwriting(id: DocumentId, rev: Revision) -> Self {
        Self {
            id,
            options: Options::new().with("rev", rev.into_inner()),
        }
    }

    /// Renders the `Destination` header value: `id` or `id?k=v&...`.
    pub fn header_value(&self) -> String {
        if self.options.is_empty() {
            return self.id.to_string();
        }
        let query = self
            .options
            .to_query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.id, query)
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// An attachment body with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment name.
    pub name: AttachmentName,
    /// MIME type.
    pub content_type: String,
    /// Raw content.
    pub data: Vec<u8>,
}

/// Attachment metadata from `HEAD /{db}/{docid}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// MIME type.
    pub content_type: Option<String>,
    /// Length in bytes.
    pub length: u64,
    /// Base64 MD5 digest (`Content-MD5`), when the server sends one.
    pub digest: Option<String>,
    /// Content encoding (e.g. `gzip`), when compressed.
    pub encoding: Option<String>,
}
