//! Failures that end a running feed.

use thiserror::Error;

/// Why a feed's background reader stopped early.
///
/// Errors opening a feed are [`transport::Error`]s returned by
/// [`crate::open_feed`]; a `StreamError` is only ever reported through
/// [`crate::FeedEnd::Failed`] after the feed was running.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading the next chunk of the response body failed.
    #[error("failed to read feed body: {0}")]
    Read(#[source] reqwest::Error),

    /// A non-empty line was not a valid record.
    #[error("failed to decode feed line '{line}': {source}")]
    Decode {
        /// The offending line, lossily decoded as UTF-8.
        line: String,
        /// The decoder's error.
        source: serde_json::Error,
    },

    /// The reader task panicked or was aborted by the runtime.
    #[error("feed reader task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}
