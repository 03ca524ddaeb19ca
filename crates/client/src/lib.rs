//! CouchDB client.
//!
//! [`Server`] and [`Database`] are cheap, cloneable handles over a shared
//! [`transport::Connection`]. Most calls are a single request and response;
//! two parts carry real behaviour:
//!
//! - **Continuous feeds.** [`Server::db_updates_feed`] and
//!   [`Database::changes_feed`] each open a dedicated connection read by one
//!   background task, and return a [`Feed`] that yields events in order until
//!   it is closed.
//! - **Bulk writes.** [`Database::delete_many`] and
//!   [`Database::insert_many`] (and their all-or-nothing `must_` variants)
//!   validate and shape a [`Collection`] before anything is sent.
//!
//! ```no_run
//! # async fn run() -> client::Result<()> {
//! use client::{ClientConfig, Options, Server};
//!
//! let server = Server::connect(&ClientConfig::from_env()?)?;
//! let db = server.must_get_database("orders", None).await?;
//!
//! let mut feed = db.changes_feed(&Options::new().with("since", "now")).await?;
//! while let Some(change) = feed.next().await {
//!     println!("{} -> {}", change.id, change.seq);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architectural Layer
//!
//! **Orchestration.** This crate sequences validation from `model`, requests
//! through `transport`, and feed readers from `feeds`. It adds no domain rules
//! of its own.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`server`] | Server-scope calls, database handles, `_db_updates` |
//! | [`database`] | Documents, `_all_docs`, `_changes` |
//! | [`bulk`] | `_bulk_docs` and the `*_many` shortcuts |
//! | [`maintenance`] | Compaction, commits, purge, revision bookkeeping |
//! | [`attachments`] | Attachment upload, download, and deletion |
//! | [`security`] | `_security` and [`DatabaseSecurity`] |
//! | [`session`] | Cookie sessions |
//! | [`config`] | [`ClientConfig`] from the environment |

pub mod attachments;
pub mod bulk;
pub mod config;
pub mod database;
pub mod error;
pub mod maintenance;
pub mod security;
pub mod server;
pub mod session;

mod reply;

pub use bulk::BulkOptions;
pub use config::ClientConfig;
pub use database::Database;
pub use error::{Error, Result};
pub use security::DatabaseSecurity;
pub use server::Server;
pub use session::Session;

pub use feeds::{Feed, FeedEnd, StreamError};
pub use model::{
    Attachment, AttachmentInfo, AttachmentName, BulkRecord, Collection, ConfigurationError,
    DatabaseChanges, DatabaseEvent, DatabaseName, DbEventKind, DbInfo, Destination, DocumentHead,
    DocumentId, DocumentIdentity,
    Options, Revision, SecurityGroup, SecurityObject, Sequence, ServerEvent, ServerInfo,
    ShapeError, UpdateResult, UserRecord, ViewResult,
};
pub use transport::{Authenticator, BasicAuth, SessionCookie};
