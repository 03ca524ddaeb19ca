//! Bulk writes through `_bulk_docs`.

use model::{shape_for_delete, shape_for_insert, Collection, UpdateResult};
use serde::Serialize;
use tracing::{debug, field, instrument, Span};
use transport::header::HeaderName;
use transport::Request;

use crate::database::{Database, FULL_COMMIT};
use crate::error::Result;

/// How the server applies a `_bulk_docs` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    /// Commit every record or none of them.
    pub all_or_nothing: bool,
    /// Let the server assign new revisions. When `false`, records are stored
    /// with the revisions they carry, as replication does.
    pub new_edits: bool,
    /// Force the batch to disk before the server answers.
    pub full_commit: bool,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            all_or_nothing: false,
            new_edits: true,
            full_commit: false,
        }
    }
}

impl BulkOptions {
    /// The options the `*_many` shortcuts use: full commit, new edits, and
    /// atomicity as requested.
    pub fn committed(all_or_nothing: bool) -> Self {
        Self {
            all_or_nothing,
            new_edits: true,
            full_commit: true,
        }
    }
}

#[derive(Serialize)]
struct BulkDocs<'a, T> {
    docs: &'a [T],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    all_or_nothing: bool,
    #[serde(skip_serializing_if = "is_true")]
    new_edits: bool,
}

fn is_true(value: &bool) -> bool {
    *value
}

impl Database {
    /// Submits `docs` to `_bulk_docs` as they are.
    ///
    /// This is the primitive behind the `*_many` calls; it performs no
    /// validation. The result holds one entry per record, in order, each
    /// either written or carrying the server's error for that record.
    #[instrument(skip_all, fields(db = %self.name(), docs = docs.len()))]
    pub async fn update<T: Serialize>(
        &self,
        docs: &[T],
        options: BulkOptions,
    ) -> Result<Vec<UpdateResult>> {
        let body = BulkDocs {
            docs,
            all_or_nothing: options.all_or_nothing,
            new_edits: options.new_edits,
        };
        let mut request = Request::post(self.endpoint().segment("_bulk_docs")).json(&body)?;
        if options.full_commit {
            request = request.header(HeaderName::from_static(FULL_COMMIT), "true")?;
        }

        let results: Vec<UpdateResult> = self.send_json(request).await?;
        debug!(
            written = results.iter().filter(|r| r.is_success()).count(),
            "bulk update finished"
        );
        Ok(results)
    }

    /// Inserts or updates many documents; records are written independently.
    pub async fn insert_many<T: Serialize>(&self, docs: &[T]) -> Result<Vec<UpdateResult>> {
        let records = shape_for_insert(docs)?;
        self.update(&records, BulkOptions::committed(false)).await
    }

    /// Inserts or updates many documents; either all are written or none.
    pub async fn must_insert_many<T: Serialize>(&self, docs: &[T]) -> Result<Vec<UpdateResult>> {
        let records = shape_for_insert(docs)?;
        self.update(&records, BulkOptions::committed(true)).await
    }

    /// Deletes many documents; records are deleted independently.
    ///
    /// Every element must carry `_id` and `_rev`. An invalid collection is
    /// rejected before any request is sent.
    #[instrument(skip_all, fields(db = %self.name(), docs = field::Empty))]
    pub async fn delete_many<'a>(
        &self,
        collection: impl Into<Collection<'a>>,
    ) -> Result<Vec<UpdateResult>> {
        self.delete_shaped(collection.into(), false).await
    }

    /// Deletes many documents; either all are deleted or none.
    ///
    /// Validation is the same as for [`Database::delete_many`].
    #[instrument(skip_all, fields(db = %self.name(), docs = field::Empty))]
    pub async fn must_delete_many<'a>(
        &self,
        collection: impl Into<Collection<'a>>,
    ) -> Result<Vec<UpdateResult>> {
        self.delete_shaped(collection.into(), true).await
    }

    async fn delete_shaped(
        &self,
        collection: Collection<'_>,
        all_or_nothing: bool,
    ) -> Result<Vec<UpdateResult>> {
        let records = shape_for_delete(collection)?;
        Span::current().record("docs", records.len());
        self.update(&records, BulkOptions::committed(all_or_nothing))
            .await
    }
}
