//! Newtype identifiers for the things a CouchDB server names.
//!
//! Document ids, revisions, and database names are all strings on the wire.
//! Wrapping each in its own type keeps a [`Revision`] from being passed where
//! a [`DocumentId`] is expected.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, AsRef<str>.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the owned string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// The `_id` of a document.
    ///
    /// Design documents carry the `_design/` prefix and local documents the
    /// `_local/` prefix; both are part of the id.
    DocumentId
}

string_id! {
    /// A document revision token (`_rev`), e.g. `"1-967a00dff5e02add41819138abb3284d"`.
    Revision
}

string_id! {
    /// The name of an attachment stored on a document.
    AttachmentName
}

// ---------------------------------------------------------------------------
// Database names
// ---------------------------------------------------------------------------

/// The name of a database on the server.
///
/// Ordinary names must start with a lowercase letter and may contain only
/// lowercase letters, digits, and the characters `_ $ ( ) + - /`. Names that
/// start with `_` are reserved for system databases (`_users`,
/// `_replicator`, ...) and are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseName(String);

impl DatabaseName {
    /// Validates `value` against the server's naming rule.
    pub fn parse(value: impl Into<String>) -> Result<Self, ConfigurationError> {
        let name = value.into();
        if Self::is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(ConfigurationError::InvalidDatabaseName { name })
        }
    }

    fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some('_') => name.len() > 1,
            Some(first) if first.is_ascii_lowercase() => chars.all(|c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c)
            }),
            _ => false,
        }
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for reserved system databases such as `_users`.
    pub fn is_system(&self) -> bool {
        self.0.starts_with('_')
    }
}

impl std::fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DatabaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

/// A position in a database's change history.
///
/// 1.x servers report plain integers; clustered 2.x+ servers report opaque
/// string tokens that must be echoed back verbatim (e.g. as `since`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sequence {
    /// Integer sequence number.
    Number(u64),
    /// Opaque sequence token.
    Token(String),
}

impl Default for Sequence {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Token(t) => write!(f, "{t}"),
        }
    }
}
