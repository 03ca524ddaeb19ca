//! Feed-style validation for the change and database-update endpoints.
//!
//! Both `/_db_updates` and `/{db}/_changes` serve two kinds of call: a
//! one-shot request that returns a finite JSON document, and a continuous
//! feed that streams one JSON object per line. Each call accepts exactly one
//! style, and a mismatched `feed` option is rejected here, before a request
//! is built.

use serde_json::Value;

use crate::errors::{json_kind, ConfigurationError};
use crate::options::Options;

/// The `feed` value for newline-delimited streaming.
pub const CONTINUOUS: &str = "continuous";

const FEED: &str = "feed";

/// Validates options for a one-shot call and renders its query.
///
/// Any `feed` style except `continuous` is passed through (e.g. `longpoll`).
pub fn one_shot_query(
    operation: &'static str,
    options: &Options,
) -> Result<Vec<(String, String)>, ConfigurationError> {
    if requested_style(options)? == Some(CONTINUOUS) {
        return Err(ConfigurationError::FeedStyle {
            operation,
            requested: CONTINUOUS.to_string(),
            hint: "open a continuous feed instead",
        });
    }
    Ok(options.to_query())
}

/// Validates options for a continuous feed and renders its query.
///
/// The caller's `feed` option, if any, must already be `continuous`; the
/// rendered query always leads with `feed=continuous`.
pub fn continuous_query(
    operation: &'static str,
    options: &Options,
) -> Result<Vec<(String, String)>, ConfigurationError> {
    match requested_style(options)? {
        None | Some(CONTINUOUS) => {}
        Some(other) => {
            return Err(ConfigurationError::FeedStyle {
                operation,
                requested: other.to_string(),
                hint: "use the one-shot call for non-continuous feeds",
            });
        }
    }

    let mut rest = options.clone();
    rest.remove(FEED);

    let mut query = vec![(FEED.to_string(), CONTINUOUS.to_string())];
    query.extend(rest.to_query());
    Ok(query)
}

fn requested_style(options: &Options) -> Result<Option<&str>, ConfigurationError> {
    match options.get(FEED) {
        None => Ok(None),
        Some(Value::String(style)) => Ok(Some(style.as_str())),
        Some(other) => Err(ConfigurationError::FeedOptionType {
            found: json_kind(other),
        }),
    }
}
