//! Document attachments.

use model::{Attachment, AttachmentInfo, AttachmentName, ConfigurationError, Revision, UpdateResult};
use transport::header::{HeaderMap, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, IF_MATCH};
use transport::{Endpoint, Request};

use crate::database::Database;
use crate::error::Result;
use crate::reply::{non_empty, written_revision};

const CONTENT_MD5: &str = "content-md5";

impl Database {
    fn attachment(&self, id: &str, name: &str) -> Result<Endpoint> {
        Ok(self.document(id)?.segment(non_empty(name, "attachment name")?))
    }

    /// Uploads `attachment` to document `id` and returns the document's new
    /// revision.
    ///
    /// `rev` is the document's current revision; pass `None` to create the
    /// document along with its first attachment.
    pub async fn save_attachment(
        &self,
        id: impl AsRef<str>,
        rev: Option<&Revision>,
        attachment: &Attachment,
    ) -> Result<Revision> {
        let endpoint = self.attachment(id.as_ref(), attachment.name.as_str())?;
        let mut request =
            Request::put(endpoint).body(&attachment.content_type, attachment.data.clone())?;
        if let Some(rev) = rev {
            request = request.param("rev", rev);
        }
        let result: UpdateResult = self.send_json(request).await?;
        written_revision(result, "save_attachment")
    }

    /// Reads an attachment's metadata without its content.
    pub async fn attachment_info(
        &self,
        id: impl AsRef<str>,
        name: impl AsRef<str>,
    ) -> Result<AttachmentInfo> {
        let endpoint = self.attachment(id.as_ref(), name.as_ref())?;
        let request = Request::head(endpoint).auth(self.auth());
        let response = self.conn().send(request).await?;

        let headers = response.headers();
        let length = header_str(headers, CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse().ok())
            .ok_or(transport::Error::MissingHeader { name: "Content-Length" })?;
        Ok(AttachmentInfo {
            content_type: header_str(headers, CONTENT_TYPE.as_str()).map(str::to_string),
            length,
            digest: header_str(headers, CONTENT_MD5).map(str::to_string),
            encoding: header_str(headers, CONTENT_ENCODING.as_str()).map(str::to_string),
        })
    }

    /// Downloads an attachment. With `rev`, the request fails unless the
    /// document is still at that revision.
    pub async fn get_attachment(
        &self,
        id: impl AsRef<str>,
        name: impl AsRef<str>,
        rev: Option<&Revision>,
    ) -> Result<Attachment> {
        let name = AttachmentName::new(name.as_ref()).ok_or(
            ConfigurationError::EmptyIdentifier {
                what: "attachment name",
            },
        )?;
        let endpoint = self.attachment(id.as_ref(), name.as_str())?;
        let mut request = Request::get(endpoint).auth(self.auth());
        if let Some(rev) = rev {
            request = request.header(IF_MATCH, rev.as_str())?;
        }
        let response = self.conn().send(request).await?;

        let content_type = header_str(response.headers(), CONTENT_TYPE.as_str())
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = response.bytes().await.map_err(transport::Error::from)?;
        Ok(Attachment {
            name,
            content_type,
            data: data.to_vec(),
        })
    }

    /// Deletes an attachment and returns the document's new revision.
    ///
    /// The document's current revision is required; `None` is rejected
    /// before any request.
    pub async fn delete_attachment(
        &self,
        id: impl AsRef<str>,
        name: impl AsRef<str>,
        rev: Option<&Revision>,
    ) -> Result<Revision> {
        let rev = rev.ok_or(ConfigurationError::MissingRevision {
            operation: "delete_attachment",
        })?;
        let endpoint = self.attachment(id.as_ref(), name.as_ref())?;
        let request = Request::delete(endpoint).header(IF_MATCH, rev.as_str())?;
        let result: UpdateResult = self.send_json(request).await?;
        written_revision(result, "delete_attachment")
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
