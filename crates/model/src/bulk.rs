//! Bulk mutation shaping.
//!
//! `_bulk_docs` takes a flat list of JSON objects. Callers hold their
//! documents in whatever form suits them: raw JSON they loaded from
//! somewhere, field maps, or their own typed structs. This module reduces all
//! of those to a uniform list of [`BulkRecord`]s and validates them for the
//! requested operation, so that a bad batch fails before anything is sent.
//!
//! ## Input forms
//!
//! [`Collection`] is the closed set of accepted inputs. It is matched once,
//! at the entry point:
//!
//! | Variant | Typical source | Identity read from |
//! |---------|----------------|--------------------|
//! | [`Collection::Json`] | untyped JSON (file, another service) | `_id` / `_rev` keys |
//! | [`Collection::Records`] | field maps built in code | `_id` / `_rev` keys |
//! | [`Collection::Documents`] | caller structs | [`DocumentIdentity`] |
//!
//! ## Deletion
//!
//! Every element must carry both `_id` and `_rev` as non-empty strings. The
//! output record gets `"_deleted": true`. Records keep all their other fields;
//! typed documents are reduced to `{_id, _rev, _deleted}` since nothing else
//! matters for a deletion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{json_kind, ShapeError};

/// Key holding a document's identity.
pub const ID_FIELD: &str = "_id";
/// Key holding a document's revision.
pub const REV_FIELD: &str = "_rev";
/// Key marking a document as deleted.
pub const DELETED_FIELD: &str = "_deleted";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One document destined for a `_bulk_docs` request, as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkRecord(Map<String, Value>);

impl BulkRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record holding only an identity and a revision.
    pub fn with_identity(id: impl Into<String>, rev: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ID_FIELD.to_string(), Value::String(id.into()));
        fields.insert(REV_FIELD.to_string(), Value::String(rev.into()));
        Self(fields)
    }

    /// Sets a field and returns the record, for chaining.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if the record is tagged for deletion.
    pub fn is_deleted(&self) -> bool {
        matches!(self.0.get(DELETED_FIELD), Some(Value::Bool(true)))
    }

    /// Returns the underlying field map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the record and returns the underlying field map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn mark_deleted(&mut self) {
        self.0.insert(DELETED_FIELD.to_string(), Value::Bool(true));
    }
}

impl From<Map<String, Value>> for BulkRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

// ---------------------------------------------------------------------------
// Typed documents
// ---------------------------------------------------------------------------

/// Identity and revision of a caller-defined document type.
///
/// Implement this once per document type to pass instances of it to bulk
/// deletion. Return `None` for a value that is not set; an `Option<String>`
/// revision field maps straight onto `rev()`.
///
/// ```
/// use model::bulk::DocumentIdentity;
///
/// struct Invoice {
///     number: String,
///     rev: Option<String>,
///     total_cents: u64,
/// }
///
/// impl DocumentIdentity for Invoice {
///     fn id(&self) -> Option<&str> {
///         Some(&self.number)
///     }
///     fn rev(&self) -> Option<&str> {
///         self.rev.as_deref()
///     }
/// }
/// ```
pub trait DocumentIdentity {
    /// The document's `_id`.
    fn id(&self) -> Option<&str>;

    /// The document's current `_rev`.
    fn rev(&self) -> Option<&str>;
}

impl DocumentIdentity for BulkRecord {
    fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    fn rev(&self) -> Option<&str> {
        self.0.get(REV_FIELD).and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// The accepted forms of "many documents to mutate".
#[derive(Clone)]
pub enum Collection<'a> {
    /// Untyped JSON. Must be an array whose elements are objects.
    Json(Value),
    /// Field maps.
    Records(Vec<BulkRecord>),
    /// Typed documents, borrowed.
    Documents(Vec<&'a (dyn DocumentIdentity + Sync)>),
}

impl std::fmt::Debug for Collection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Records(records) => f.debug_tuple("Records").field(records).finish(),
            Self::Documents(docs) => write!(f, "Documents(<{} documents>)", docs.len()),
        }
    }
}

impl From<Value> for Collection<'_> {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<BulkRecord>> for Collection<'_> {
    fn from(records: Vec<BulkRecord>) -> Self {
        Self::Records(records)
    }
}

impl From<Vec<Map<String, Value>>> for Collection<'_> {
    fn from(maps: Vec<Map<String, Value>>) -> Self {
        Self::Records(maps.into_iter().map(BulkRecord::from).collect())
    }
}

impl<'a, D> From<&'a [D]> for Collection<'a>
where
    D: DocumentIdentity + Sync + 'a,
{
    fn from(docs: &'a [D]) -> Self {
        Self::Documents(docs.iter().map(|d| d as &(dyn DocumentIdentity + Sync)).collect())
    }
}

impl<'a, D> From<&'a Vec<D>> for Collection<'a>
where
    D: DocumentIdentity + Sync + 'a,
{
    fn from(docs: &'a Vec<D>) -> Self {
        Self::from(docs.as_slice())
    }
}

// ---------------------------------------------------------------------------
// Shaping
// ---------------------------------------------------------------------------

/// Validates `collection` for deletion and tags every record with
/// `"_deleted": true`.
///
/// Output order matches input order. Fails on the first invalid element; no
/// partial result is returned.
pub fn shape_for_delete<'a>(
    collection: impl Into<Collection<'a>>,
) -> Result<Vec<BulkRecord>, ShapeError> {
    match collection.into() {
        Collection::Json(Value::Array(elements)) => elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| match element {
                Value::Object(fields) => deletion_record(index, BulkRecord(fields)),
                other => Err(ShapeError::UnsupportedElement {
                    index,
                    kind: json_kind(&other),
                }),
            })
            .collect(),
        Collection::Json(other) => Err(ShapeError::ExpectsSequence {
            found: json_kind(&other),
        }),
        Collection::Records(records) => records
            .into_iter()
            .enumerate()
            .map(|(index, record)| deletion_record(index, record))
            .collect(),
        Collection::Documents(docs) => docs
            .into_iter()
            .enumerate()
            .map(|(index, doc)| typed_deletion_record(index, doc))
            .collect(),
    }
}

/// Serialises `docs` for insertion.
///
/// No identity is required: documents without `_id` get a server-assigned
/// one.
pub fn shape_for_insert<T: Serialize>(docs: &[T]) -> Result<Vec<Value>, ShapeError> {
    docs.iter()
        .enumerate()
        .map(|(index, doc)| {
            serde_json::to_value(doc).map_err(|e| ShapeError::Serialize {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}

fn deletion_record(index: usize, mut record: BulkRecord) -> Result<BulkRecord, ShapeError> {
    require_text(index, &record, ID_FIELD)?;
    require_text(index, &record, REV_FIELD)?;
    record.mark_deleted();
    Ok(record)
}

fn require_text(index: usize, record: &BulkRecord, field: &'static str) -> Result<(), ShapeError> {
    match record.get(field) {
        None => Err(ShapeError::MissingField { index, field }),
        Some(Value::String(s)) if !s.is_empty() => Ok(()),
        Some(Value::String(_)) => Err(ShapeError::FieldType {
            index,
            field,
            found: "empty string",
        }),
        Some(other) => Err(ShapeError::FieldType {
            index,
            field,
            found: json_kind(other),
        }),
    }
}

fn typed_deletion_record(
    index: usize,
    doc: &dyn DocumentIdentity,
) -> Result<BulkRecord, ShapeError> {
    let id = doc
        .id()
        .filter(|s| !s.is_empty())
        .ok_or(ShapeError::MissingField { index, field: ID_FIELD })?;
    let rev = doc
        .rev()
        .filter(|s| !s.is_empty())
        .ok_or(ShapeError::MissingField { index, field: REV_FIELD })?;

    let mut record = BulkRecord::with_identity(id, rev);
    record.mark_deleted();
    Ok(record)
}
