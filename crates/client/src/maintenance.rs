//! Compaction, commits, purging and revision bookkeeping.

use std::collections::BTreeMap;

use model::{MissingRevs, PurgeResult, RevisionMap, RevsDiffEntry};
use transport::Request;

use crate::database::Database;
use crate::error::Result;
use crate::reply::{non_empty, Ack};

impl Database {
    /// Starts compaction of the database file.
    pub async fn compact(&self) -> Result<()> {
        let request = Request::post(self.endpoint().segment("_compact")).json_content_type();
        let ack: Ack = self.send_json(request).await?;
        ack.require("compact")
    }

    /// Starts compaction of the view indexes of design document `ddoc`
    /// (given without its `_design/` prefix).
    pub async fn compact_design(&self, ddoc: &str) -> Result<()> {
        let ddoc = non_empty(ddoc, "design document name")?;
        let request = Request::post(self.endpoint().segment("_compact").segment(ddoc))
            .json_content_type();
        let ack: Ack = self.send_json(request).await?;
        ack.require("compact_design")
    }

    /// Commits recent changes to disk.
    pub async fn ensure_full_commit(&self) -> Result<()> {
        let request =
            Request::post(self.endpoint().segment("_ensure_full_commit")).json_content_type();
        let ack: Ack = self.send_json(request).await?;
        ack.require("ensure_full_commit")
    }

    /// Removes index files no design document refers to any more.
    pub async fn view_cleanup(&self) -> Result<()> {
        let request = Request::post(self.endpoint().segment("_view_cleanup")).json_content_type();
        let ack: Ack = self.send_json(request).await?;
        ack.require("view_cleanup")
    }

    /// Permanently removes the given revisions.
    pub async fn purge(&self, revisions: &RevisionMap) -> Result<PurgeResult> {
        let request = Request::post(self.endpoint().segment("_purge")).json(revisions)?;
        self.send_json(request).await
    }

    /// Returns the subset of `revisions` the database does not have.
    pub async fn missing_revs(&self, revisions: &RevisionMap) -> Result<MissingRevs> {
        let request = Request::post(self.endpoint().segment("_missing_revs")).json(revisions)?;
        self.send_json(request).await
    }

    /// Like [`Database::missing_revs`], and also names stored revisions that
    /// may be ancestors of the missing ones.
    pub async fn revs_diff(
        &self,
        revisions: &RevisionMap,
    ) -> Result<BTreeMap<String, RevsDiffEntry>> {
        let request = Request::post(self.endpoint().segment("_revs_diff")).json(revisions)?;
        self.send_json(request).await
    }

    /// The number of revisions the database keeps per document.
    pub async fn revs_limit(&self) -> Result<u64> {
        self.send_json(Request::get(self.endpoint().segment("_revs_limit")))
            .await
    }

    /// Sets the number of revisions the database keeps per document.
    pub async fn set_revs_limit(&self, limit: u64) -> Result<()> {
        let request = Request::put(self.endpoint().segment("_revs_limit")).json(&limit)?;
        let ack: Ack = self.send_json(request).await?;
        ack.require("set_revs_limit")
    }
}
