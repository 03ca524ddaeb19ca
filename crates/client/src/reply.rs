// Shapes of the small acknowledgement bodies most write endpoints return.

use model::{ConfigurationError, Revision, UpdateResult};
use serde::Deserialize;

use crate::error::{Error, Result};

/// `{"ok": true}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Ack {
    #[serde(default)]
    pub(crate) ok: bool,
}

impl Ack {
    pub(crate) fn require(self, operation: &'static str) -> Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(Error::OperationFailed { operation })
        }
    }
}

/// Extracts the new revision from a single-document write.
pub(crate) fn written_revision(result: UpdateResult, operation: &'static str) -> Result<Revision> {
    match result.rev {
        Some(rev) if result.error.is_none() => Ok(rev),
        _ => Err(Error::OperationFailed { operation }),
    }
}

/// Rejects an empty identifier before it reaches a path.
pub(crate) fn non_empty<'a>(value: &'a str, what: &'static str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(ConfigurationError::EmptyIdentifier { what }.into());
    }
    Ok(value)
}
