//! Request paths relative to the server's base URL.

use url::Url;

use crate::error::{Error, Result};

/// Prefixes that are part of a document id but stay literal in the path.
const LITERAL_PREFIXES: [&str; 2] = ["_design/", "_local/"];

/// A path below the base URL, kept as unencoded segments until it is joined.
///
/// Every segment is percent-encoded as a whole, so a database name such as
/// `a/b` or a document id such as `x?y` cannot escape its segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    segments: Vec<String>,
}

impl Endpoint {
    /// The server root (`/`).
    pub fn root() -> Self {
        Self::default()
    }

    /// A single-segment path such as `/_all_dbs` or `/{db}`.
    pub fn path(segment: impl AsRef<str>) -> Self {
        Self::root().segment(segment)
    }

    /// Appends one segment.
    #[must_use]
    pub fn segment(mut self, segment: impl AsRef<str>) -> Self {
        self.segments.push(segment.as_ref().to_string());
        self
    }

    /// Appends a document id, keeping a `_design/` or `_local/` prefix as a
    /// literal path separator.
    #[must_use]
    pub fn document(self, id: impl AsRef<str>) -> Self {
        let id = id.as_ref();
        for prefix in LITERAL_PREFIXES {
            if let Some(rest) = id.strip_prefix(prefix) {
                return self.segment(prefix.trim_end_matches('/')).segment(rest);
            }
        }
        self.segment(id)
    }

    /// The unencoded segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Joins this path onto `base`, preserving any path prefix `base` has.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::CannotBeABase(base.to_string()))?;
            path.pop_if_empty();
            for segment in &self.segments {
                path.push(segment);
            }
        }
        Ok(url)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
