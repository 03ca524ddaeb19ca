//! Continuous feed consumer.
//!
//! CouchDB streams `/_db_updates` and `/{db}/_changes` as newline-delimited
//! JSON when asked for `feed=continuous`. [`open_feed`] sends such a request
//! on a dedicated copy of a [`transport::Connection`] and hands the body to a
//! single background task, which decodes one record per line and delivers it
//! over a one-slot channel to the [`Feed`] the caller holds.
//!
//! ## Lifecycle
//!
//! | Event | Outcome |
//! |-------|---------|
//! | [`Feed::close`] or drop | reader stops at its next await point, [`FeedEnd::Closed`] |
//! | server sends `{"last_seq": ...}` | [`FeedEnd::Completed`] |
//! | server ends the body | [`FeedEnd::Eof`] |
//! | read or decode error | [`FeedEnd::Failed`], logged at `warn` |
//!
//! In every case the reader's connection is released when the task returns.
//! Feeds never reconnect; resume by opening a new one with `since` set to the
//! last sequence seen.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate knows how to read a feed, not which feeds
//! exist. The `client` crate builds the requests and validates feed options.

mod error;
mod feed;
mod lines;
mod record;

pub use error::StreamError;
pub use feed::{open_feed, Feed, FeedEnd};
pub use record::{FeedLine, FeedRecord};
