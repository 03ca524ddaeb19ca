//! Domain types for the CouchDB client.
//!
//! This crate holds every value that crosses the client's public API and
//! every rule that can be checked without talking to a server: identifier
//! validation, feed-style validation, and the bulk mutation shaper.
//!
//! ## Architectural Layer
//!
//! **Business logic.** This crate has no I/O dependencies. The crates above
//! it move bytes and sequence calls but add no domain rules of their own.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`DocumentId`, `Revision`, `DatabaseName`, `Sequence`) |
//! | [`options`] | Free-form query options |
//! | [`feed`] | One-shot vs continuous feed validation |
//! | [`events`] | Records delivered by `_db_updates` and `_changes` |
//! | [`bulk`] | Bulk mutation shaping for `_bulk_docs` |
//! | [`types`] | Request/response bodies for the remaining endpoints |
//! | [`security`] | The per-database security object |
//! | [`errors`] | Configuration and shaping errors |

pub mod bulk;
pub mod errors;
pub mod events;
pub mod feed;
pub mod identifiers;
pub mod options;
pub mod security;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use bulk::{shape_for_delete, shape_for_insert, BulkRecord, Collection, DocumentIdentity};
pub use errors::{ConfigurationError, ShapeError};
pub use events::{
    ChangeRevision, DatabaseChanges, DatabaseEvent, DbEventKind, FeedTerminator, ServerEvent,
};
pub use identifiers::{AttachmentName, DatabaseName, DocumentId, Revision, Sequence};
pub use options::Options;
pub use security::{SecurityGroup, SecurityObject};
pub use types::{
    Attachment, AttachmentInfo, DbInfo, Destination, DocumentHead, MissingRevs, PurgeResult,
    ReplicationResult, RevisionMap, RevsDiffEntry, ServerInfo, UpdateResult, UserRecord, ViewResult,
    ViewRow,
};
