//! Errors raised before any request leaves the client.
//!
//! [`ConfigurationError`] covers arguments that can never produce a valid
//! request (wrong feed style, zero counts, malformed names). [`ShapeError`]
//! covers bulk collections that fail validation in [`crate::bulk`]. Both are
//! always returned synchronously, so a caller that sees one knows the server
//! was never contacted.
//!
//! Transport and stream failures are defined in their respective crates.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// An argument or option combination that is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A one-shot call was given `feed=continuous`, or a continuous feed was
    /// given any other feed style.
    ///
    /// `operation` names the rejected call; `hint` points at the call that
    /// accepts the requested style.
    #[error("{operation} does not accept feed={requested}; {hint}")]
    FeedStyle {
        /// The call that rejected the option.
        operation: &'static str,
        /// The feed style the caller asked for.
        requested: String,
        /// Which call to use instead.
        hint: &'static str,
    },

    /// The `feed` option was present but not a string.
    #[error("feed option must be a string, got {found}")]
    FeedOptionType {
        /// JSON kind of the supplied value.
        found: &'static str,
    },

    /// A count argument must be at least one.
    #[error("{argument} must be greater than zero")]
    InvalidCount {
        /// Name of the offending argument.
        argument: &'static str,
    },

    /// The database name does not satisfy the server's naming rule.
    #[error("invalid database name '{name}'")]
    InvalidDatabaseName {
        /// The rejected name.
        name: String,
    },

    /// A document id or attachment name was empty.
    #[error("{what} must not be empty")]
    EmptyIdentifier {
        /// What was empty (e.g. `"document id"`).
        what: &'static str,
    },

    /// An operation that modifies an existing revision was given none.
    #[error("revision can't be empty for {operation}")]
    MissingRevision {
        /// The operation that needs the revision.
        operation: &'static str,
    },

    /// A configuration value (environment variable, flag) could not be used.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// The configuration key.
        key: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Bulk shaping errors
// ---------------------------------------------------------------------------

/// A bulk collection that cannot be turned into `_bulk_docs` records.
///
/// `index` is always the zero-based position of the offending element in the
/// caller's collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// The collection itself is not an ordered sequence.
    #[error("bulk operations expect a sequence of documents, got {found}")]
    ExpectsSequence {
        /// JSON kind of the value that was supplied instead.
        found: &'static str,
    },

    /// An element is neither a field mapping nor a typed document.
    #[error("unsupported document type at index {index}: {kind}")]
    UnsupportedElement {
        /// Position of the element.
        index: usize,
        /// JSON kind of the element.
        kind: &'static str,
    },

    /// An element lacks its identity or revision.
    #[error("document at index {index} does not contain \"{field}\"")]
    MissingField {
        /// Position of the element.
        index: usize,
        /// The missing key: `"_id"` or `"_rev"`.
        field: &'static str,
    },

    /// An identity or revision is present but is not a non-empty string.
    #[error("document at index {index} has \"{field}\" of type {found}, expected a non-empty string")]
    FieldType {
        /// Position of the element.
        index: usize,
        /// The key holding the wrong type: `"_id"` or `"_rev"`.
        field: &'static str,
        /// JSON kind actually found.
        found: &'static str,
    },

    /// A document could not be serialised to JSON.
    #[error("document at index {index} could not be serialised: {message}")]
    Serialize {
        /// Position of the element.
        index: usize,
        /// The serializer's message.
        message: String,
    },
}

/// Returns a short name for the JSON kind of `value`, for error messages.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
