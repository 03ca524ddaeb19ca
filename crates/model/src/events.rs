//! Records delivered by the server's feeds.
//!
//! Each line of a continuous feed decodes into exactly one of these. They are
//! plain data: nothing in the client mutates an event after decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{DocumentId, Revision, Sequence};

// ---------------------------------------------------------------------------
// Server scope: /_db_updates
// ---------------------------------------------------------------------------

/// What happened to a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbEventKind {
    /// The database was created.
    Created,
    /// The database was deleted.
    Deleted,
    /// A document in the database was written.
    Updated,
    /// Any kind this client does not model (e.g. `ddoc_updated` on 2.x+).
    #[serde(other)]
    Other,
}

/// A database lifecycle event from `/_db_updates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    /// Name of the affected database.
    pub db_name: String,

    /// Whether the server reports the event as successful. 2.x+ servers
    /// omit the field, which reads as `false`.
    #[serde(default)]
    pub ok: bool,

    /// The kind of event.
    #[serde(rename = "type")]
    pub kind: DbEventKind,
}

// ---------------------------------------------------------------------------
// Database scope: /{db}/_changes
// ---------------------------------------------------------------------------

/// One leaf revision listed in a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRevision {
    /// The revision token.
    pub rev: Revision,
}

/// A single document change from `/{db}/_changes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseEvent {
    /// Leaf revisions of the changed document, in server order.
    pub changes: Vec<ChangeRevision>,

    /// The changed document.
    pub id: DocumentId,

    /// Position of this change in the database's history.
    pub seq: Sequence,

    /// `true` if the change deleted the document.
    #[serde(default)]
    pub deleted: bool,

    /// The document body, present when the request set `include_docs=true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

/// The result of a one-shot `/{db}/_changes` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseChanges {
    /// The sequence to pass as `since` to resume after these results.
    pub last_seq: Sequence,

    /// The changes, in sequence order.
    pub results: Vec<DatabaseEvent>,

    /// Number of changes not returned because of `limit` (2.x+ only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<u64>,
}

/// The record a continuous feed ends with when the server closes it (for
/// example once its `timeout` elapses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedTerminator {
    /// Sequence to resume from.
    pub last_seq: Sequence,
}
